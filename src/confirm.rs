//! Confirmation gate for irreversible tool calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::console::Console;

/// Operator's answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Decline,
}

impl Decision {
    /// Parse an affirmative or negative token. Anything else is `None`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Self::Proceed),
            "n" | "no" => Some(Self::Decline),
            _ => None,
        }
    }
}

/// Human approval checkpoint, consulted before a tool with irreversible
/// effects runs.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Ask whether `command` may run. Blocks until the operator decides.
    async fn confirm(&self, command: &str) -> Decision;
}

/// Gate that asks on the operator console and re-prompts until it gets a
/// yes or a no. Closed input counts as a no.
pub struct TerminalGate<R, W> {
    console: Arc<Console<R, W>>,
}

impl<R, W> TerminalGate<R, W> {
    pub fn new(console: Arc<Console<R, W>>) -> Self {
        Self { console }
    }
}

#[async_trait]
impl<R, W> ConfirmationGate for TerminalGate<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, command: &str) -> Decision {
        let question = format!(
            "\n⚠️  The agent wants to run:\n    {}\nProceed? (y/n) ",
            command
        );

        loop {
            let answer = match self.console.prompt(&question).await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::warn!("Input closed while awaiting confirmation; declining");
                    return Decision::Decline;
                }
                Err(e) => {
                    tracing::warn!("Failed to read confirmation: {}; declining", e);
                    return Decision::Decline;
                }
            };

            if let Some(decision) = Decision::parse(&answer) {
                return decision;
            }

            if let Err(e) = self.console.say("Please answer 'y' or 'n'.\n").await {
                tracing::warn!("Failed to write to console: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(input: &'static [u8]) -> TerminalGate<&'static [u8], Vec<u8>> {
        TerminalGate::new(Arc::new(Console::new(input, Vec::new())))
    }

    #[test]
    fn parses_only_yes_and_no_tokens() {
        assert_eq!(Decision::parse("Y"), Some(Decision::Proceed));
        assert_eq!(Decision::parse(" yes "), Some(Decision::Proceed));
        assert_eq!(Decision::parse("No"), Some(Decision::Decline));
        assert_eq!(Decision::parse("sure"), None);
        assert_eq!(Decision::parse(""), None);
    }

    #[tokio::test]
    async fn reprompts_until_a_valid_answer() {
        let gate = gate(b"maybe\n\nYES\n");
        assert_eq!(gate.confirm("rm -rf tmp").await, Decision::Proceed);
    }

    #[tokio::test]
    async fn negative_answer_declines() {
        let gate = gate(b"n\n");
        assert_eq!(gate.confirm("rm -rf tmp").await, Decision::Decline);
    }

    #[tokio::test]
    async fn closed_input_declines() {
        let gate = gate(b"whatever\n");
        assert_eq!(gate.confirm("rm -rf tmp").await, Decision::Decline);
    }
}
