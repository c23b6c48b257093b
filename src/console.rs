//! Operator console.
//!
//! One line reader is shared by the task prompt and the confirmation gate so
//! that buffered input is never split between two readers.

use std::io;
use std::sync::Arc;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Token that ends the session.
pub const QUIT_TOKEN: &str = "quit";
/// Token that clears the conversation and the token ledger.
pub const RESET_TOKEN: &str = "reset";

/// What the operator asked for at the task prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Quit,
    Reset,
    Task(String),
}

impl OperatorCommand {
    /// Interpret one line of operator input. Blank input yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.eq_ignore_ascii_case(QUIT_TOKEN) {
            Some(Self::Quit)
        } else if trimmed.eq_ignore_ascii_case(RESET_TOKEN) {
            Some(Self::Reset)
        } else {
            Some(Self::Task(trimmed.to_string()))
        }
    }
}

/// Line-oriented operator I/O.
pub struct Console<R, W> {
    input: Mutex<Lines<R>>,
    output: Mutex<W>,
}

impl Console<BufReader<Stdin>, Stdout> {
    /// Console bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            input: Mutex::new(reader.lines()),
            output: Mutex::new(writer),
        }
    }

    /// Print `text` and read one line. `None` means input is closed.
    pub async fn prompt(&self, text: &str) -> io::Result<Option<String>> {
        self.say(text).await?;
        self.input.lock().await.next_line().await
    }

    pub async fn say(&self, text: &str) -> io::Result<()> {
        let mut out = self.output.lock().await;
        out.write_all(text.as_bytes()).await?;
        out.flush().await
    }
}

/// Routes operator interrupts (Ctrl-C) for the whole session.
///
/// An interrupt while a task runs cancels that task. A second interrupt
/// before the task returns, or any interrupt while idle, ends the session.
#[derive(Debug, Clone, Default)]
pub struct InterruptRouter {
    shutdown: CancellationToken,
    running: Arc<Mutex<Option<CancellationToken>>>,
}

impl InterruptRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancelled once the session should end.
    pub fn shutdown(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register a new running task and return its cancellation token.
    pub async fn begin_task(&self) -> CancellationToken {
        let cancel = CancellationToken::new();
        *self.running.lock().await = Some(cancel.clone());
        cancel
    }

    pub async fn end_task(&self) {
        *self.running.lock().await = None;
    }

    pub async fn interrupt(&self) {
        match self.running.lock().await.as_ref() {
            Some(task) if !task.is_cancelled() => {
                tracing::info!("Interrupt received, cancelling current task");
                task.cancel();
            }
            _ => {
                tracing::info!("Interrupt received, ending session");
                self.shutdown.cancel();
            }
        }
    }
}
