//! Agent module - the orchestration loop and the session state it works on.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Append the operator's task to the conversation
//! 2. Call the model with the full conversation and the tool schemas
//! 3. If the model requests tool calls, run them in order and feed back the results
//! 4. Repeat until the model produces a final answer or the iteration cap is reached

mod agent_loop;
mod context;
mod ledger;
mod prompt;
mod session;
mod task_log;

pub use agent_loop::{AbortReason, Agent, LoopState, TaskOutcome, TaskReport};
pub use context::{ConversationContext, Turn};
pub use ledger::ResourceLedger;
pub use prompt::build_system_prompt;
pub use session::Session;
pub use task_log::{LogEntryType, TaskLogEntry};
