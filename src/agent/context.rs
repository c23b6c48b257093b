//! Conversation transcript replayed to the model on every turn.

use serde::Serialize;

/// One item of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    UserMessage {
        text: String,
    },
    AssistantMessage {
        text: String,
    },
    ToolCallRequest {
        id: String,
        name: String,
        raw_arguments: String,
    },
    ToolCallResult {
        id: String,
        output: String,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserMessage { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::AssistantMessage { text: text.into() }
    }

    pub fn tool_result(id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolCallResult {
            id: id.into(),
            output: output.into(),
        }
    }
}

/// Append-only, ordered transcript. Only a session reset empties it.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    turns: Vec<Turn>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Ids of tool-call requests that have no result yet, in request order.
    pub fn unanswered_calls(&self) -> Vec<&str> {
        let mut pending: Vec<&str> = Vec::new();
        for turn in &self.turns {
            match turn {
                Turn::ToolCallRequest { id, .. } => pending.push(id.as_str()),
                Turn::ToolCallResult { id, .. } => {
                    if let Some(pos) = pending.iter().position(|p| *p == id.as_str()) {
                        pending.remove(pos);
                    }
                }
                _ => {}
            }
        }
        pending
    }
}
