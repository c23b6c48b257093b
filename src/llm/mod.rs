//! Model service contract.
//!
//! The agent loop talks to the model through [`LlmClient`]. A request carries
//! the whole conversation, the tool schemas and the tool-selection mode; a
//! response carries ordered output items and token usage.

mod error;
mod openai;

use async_trait::async_trait;
use serde::Serialize;

use crate::agent::Turn;
use crate::tools::ToolSpec;

pub use error::LlmError;
pub use openai::OpenAiClient;

/// How the model may pick tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
}

/// One model invocation.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub instructions: Option<&'a str>,
    pub input: &'a [Turn],
    pub tools: &'a [ToolSpec],
    pub tool_choice: ToolChoice,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One output item of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    Text(String),
    ToolCall(ToolCall),
}

impl From<OutputItem> for Turn {
    fn from(item: OutputItem) -> Self {
        match item {
            OutputItem::Text(text) => Turn::AssistantMessage { text },
            OutputItem::ToolCall(call) => Turn::ToolCallRequest {
                id: call.id,
                name: call.name,
                raw_arguments: call.arguments,
            },
        }
    }
}

/// Token usage reported for one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub output: Vec<OutputItem>,
    pub usage: Option<Usage>,
}

impl ModelResponse {
    /// Concatenated assistant text of this response.
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Text(text) => Some(text.as_str()),
                OutputItem::ToolCall(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool calls requested by this response, in order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::ToolCall(call) => Some(call.clone()),
                OutputItem::Text(_) => None,
            })
            .collect()
    }
}

/// The model service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn create_response(&self, request: ModelRequest<'_>) -> Result<ModelResponse, LlmError>;
}
