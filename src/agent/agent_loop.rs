//! Core agent loop implementation.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! AwaitingModel -> DispatchingTools -> AwaitingModel -> ... -> Finished | Aborted
//! ```
//!
//! Suspension happens only while awaiting the model, a tool, or the
//! operator's confirmation. Tool calls from one response run sequentially in
//! the order received, and each gets exactly one result in the context
//! before the model is called again.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::confirm::ConfirmationGate;
use crate::llm::{LlmClient, LlmError, ModelRequest, OpenAiClient, ToolCall, ToolChoice};
use crate::tools::{ToolInvocation, ToolOutcome, ToolRegistry, ToolSpec};

use super::context::Turn;
use super::prompt::build_system_prompt;
use super::session::Session;
use super::task_log::{truncate_for_log, LogEntryType, TaskLogEntry};

/// Control state of the loop for the current task.
#[derive(Debug)]
pub enum LoopState {
    AwaitingModel,
    DispatchingTools(Vec<ToolCall>),
    Finished(String),
    Aborted(AbortReason),
}

/// Why a task stopped without a final answer.
#[derive(Debug, Error)]
pub enum AbortReason {
    #[error("maximum iterations reached ({0}) without a final answer")]
    IterationLimit(usize),

    #[error("model service error: {0}")]
    ModelService(#[source] LlmError),

    #[error("interrupted by operator")]
    Interrupted,
}

/// Terminal state of a task.
#[derive(Debug)]
pub enum TaskOutcome {
    Finished { answer: String },
    Aborted(AbortReason),
}

impl TaskOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// Everything a finished or aborted task reports back.
#[derive(Debug)]
pub struct TaskReport {
    pub outcome: TaskOutcome,
    /// Number of model invocations made for this task
    pub iterations: usize,
    pub log: Vec<TaskLogEntry>,
}

/// The autonomous agent.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    gate: Arc<dyn ConfirmationGate>,
}

impl Agent {
    /// Create an agent backed by the OpenAI Responses API.
    pub fn new(config: Config, gate: Arc<dyn ConfirmationGate>) -> Self {
        let llm = Arc::new(OpenAiClient::from_config(&config));
        let tools = ToolRegistry::with_shell(config.shell.clone());

        Self::with_client(config, llm, tools, gate)
    }

    /// Create an agent with an explicit model client and tool set.
    pub fn with_client(
        config: Config,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            config,
            llm,
            tools,
            gate,
        }
    }

    /// Run one task against `session`, appending to its context and ledger.
    ///
    /// `cancel` interrupts an in-flight model request; tool calls already
    /// started always run to completion.
    pub async fn run_task(
        &self,
        session: &mut Session,
        task: &str,
        cancel: &CancellationToken,
    ) -> TaskReport {
        let mut log = Vec::new();
        let workspace_str = self.config.workspace_path.to_string_lossy().to_string();
        let instructions = build_system_prompt(&workspace_str, &self.tools);
        let tool_schemas = self.tools.get_tool_schemas();

        session.context.push(Turn::user(task));

        let mut iterations = 0usize;
        let mut state = LoopState::AwaitingModel;

        let outcome = loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if iterations >= self.config.max_iterations {
                        LoopState::Aborted(AbortReason::IterationLimit(self.config.max_iterations))
                    } else {
                        iterations += 1;
                        tracing::debug!("Agent iteration {}", iterations);
                        self.await_model(session, &instructions, &tool_schemas, &mut log, cancel)
                            .await
                    }
                }
                LoopState::DispatchingTools(calls) => {
                    self.dispatch_tools(session, calls, &mut log).await;
                    LoopState::AwaitingModel
                }
                LoopState::Finished(answer) => break TaskOutcome::Finished { answer },
                LoopState::Aborted(reason) => break TaskOutcome::Aborted(reason),
            };
        };

        match &outcome {
            TaskOutcome::Finished { .. } => {
                tracing::info!(iterations, "Task finished");
            }
            TaskOutcome::Aborted(reason) => {
                tracing::error!(iterations, "Task aborted: {}", reason);
                log.push(TaskLogEntry::new(LogEntryType::Error, reason.to_string()));
            }
        }

        TaskReport {
            outcome,
            iterations,
            log,
        }
    }

    /// `AwaitingModel`: one model invocation and the resulting transition.
    async fn await_model(
        &self,
        session: &mut Session,
        instructions: &str,
        tool_schemas: &[ToolSpec],
        log: &mut Vec<TaskLogEntry>,
        cancel: &CancellationToken,
    ) -> LoopState {
        let request = ModelRequest {
            model: &self.config.default_model,
            instructions: Some(instructions),
            input: session.context.turns(),
            tools: tool_schemas,
            tool_choice: ToolChoice::Auto,
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return LoopState::Aborted(AbortReason::Interrupted),
            result = self.llm.create_response(request) => result,
        };

        match result {
            Ok(response) => {
                if let Some(usage) = response.usage {
                    tracing::debug!(
                        input = usage.input_tokens,
                        output = usage.output_tokens,
                        total = usage.total_tokens,
                        "Model usage"
                    );
                    session.ledger.record(usage.total_tokens);
                }

                let calls = response.tool_calls();
                let text = response.output_text();
                session
                    .context
                    .extend(response.output.into_iter().map(Turn::from));

                if calls.is_empty() {
                    log.push(TaskLogEntry::new(
                        LogEntryType::Response,
                        truncate_for_log(&text, 2000),
                    ));
                    LoopState::Finished(text)
                } else {
                    LoopState::DispatchingTools(calls)
                }
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Model request failed, will retry: {}", e);
                log.push(TaskLogEntry::new(LogEntryType::Error, e.to_string()));
                session.context.push(Turn::assistant(format!(
                    "[The previous model request failed: {}. Retrying.]",
                    e
                )));
                LoopState::AwaitingModel
            }
            Err(e) => LoopState::Aborted(AbortReason::ModelService(e)),
        }
    }

    /// `DispatchingTools`: run every call in order, one result per call.
    async fn dispatch_tools(
        &self,
        session: &mut Session,
        calls: Vec<ToolCall>,
        log: &mut Vec<TaskLogEntry>,
    ) {
        for call in calls {
            tracing::info!("🔧 Using tool: {}", call.name);
            log.push(TaskLogEntry::new(
                LogEntryType::ToolCall,
                format!(
                    "Calling tool: {} with args: {}",
                    call.name,
                    truncate_for_log(&call.arguments, 1000)
                ),
            ));

            let outcome = match ToolInvocation::parse(&call.name, &call.arguments) {
                Ok(invocation) => {
                    self.tools
                        .dispatch(&invocation, self.gate.as_ref(), &self.config.workspace_path)
                        .await
                }
                Err(e) => ToolOutcome::Error(e),
            };

            if let ToolOutcome::Error(e) = &outcome {
                tracing::warn!(tool = %call.name, call_id = %call.id, "Tool call failed: {}", e);
            }

            let output = outcome.into_output();
            log.push(TaskLogEntry::new(
                LogEntryType::ToolResult,
                truncate_for_log(&output, 1000),
            ));
            session.context.push(Turn::tool_result(call.id, output));
        }

        debug_assert!(session.context.unanswered_calls().is_empty());
    }
}
