//! OpenAI Responses API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{LlmClient, LlmError, ModelRequest, ModelResponse, OutputItem, ToolCall, Usage};
use crate::agent::Turn;
use crate::config::Config;

/// Client for the `/responses` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.model_timeout,
        )
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn create_response(&self, request: ModelRequest<'_>) -> Result<ModelResponse, LlmError> {
        let url = format!("{}/responses", self.base_url);
        let body = build_body(&request);

        tracing::debug!(
            model = %request.model,
            items = request.input.len(),
            tools = request.tools.len(),
            "Sending model request"
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        let retry_after = parse_retry_after(resp.headers());
        let text = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Network(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), retry_after, &text));
        }

        parse_response(&text)
    }
}

fn build_body(request: &ModelRequest<'_>) -> Value {
    let tools: Vec<Value> = request
        .tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters,
            })
        })
        .collect();

    let input: Vec<Value> = request.input.iter().map(input_item).collect();

    let mut body = json!({
        "model": request.model,
        "input": input,
        "tools": tools,
        "tool_choice": request.tool_choice,
    });
    if let Some(instructions) = request.instructions {
        body["instructions"] = Value::String(instructions.to_string());
    }
    body
}

fn input_item(turn: &Turn) -> Value {
    match turn {
        Turn::UserMessage { text } => json!({ "role": "user", "content": text }),
        Turn::AssistantMessage { text } => json!({ "role": "assistant", "content": text }),
        Turn::ToolCallRequest {
            id,
            name,
            raw_arguments,
        } => json!({
            "type": "function_call",
            "call_id": id,
            "name": name,
            "arguments": raw_arguments,
        }),
        Turn::ToolCallResult { id, output } => json!({
            "type": "function_call_output",
            "call_id": id,
            "output": output,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    output: Vec<RawItem>,
    usage: Option<RawUsage>,
    #[serde(default)]
    error: Option<RawError>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawItem {
    Message {
        #[serde(default)]
        content: Vec<RawContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawContent {
    OutputText {
        text: String,
    },
    Refusal {
        refusal: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct RawError {
    #[serde(default)]
    message: String,
}

fn parse_response(body: &str) -> Result<ModelResponse, LlmError> {
    let parsed: ResponseBody =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(LlmError::Api {
            status: 200,
            message: error.message,
        });
    }

    let mut output = Vec::new();
    for item in parsed.output {
        match item {
            RawItem::Message { content } => {
                let text = content
                    .into_iter()
                    .filter_map(|c| match c {
                        RawContent::OutputText { text } => Some(text),
                        RawContent::Refusal { refusal } => Some(refusal),
                        RawContent::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                if !text.is_empty() {
                    output.push(OutputItem::Text(text));
                }
            }
            RawItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => output.push(OutputItem::ToolCall(ToolCall {
                id: call_id,
                name,
                arguments,
            })),
            RawItem::Other => {}
        }
    }

    let usage = parsed.usage.map(|u| Usage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
        total_tokens: if u.total_tokens > 0 {
            u.total_tokens
        } else {
            u.input_tokens + u.output_tokens
        },
    });

    Ok(ModelResponse { output, usage })
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?;
    let secs: f64 = value.parse().ok()?;
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolChoice;
    use crate::tools::ToolRegistry;

    #[test]
    fn parses_text_tool_calls_and_usage() {
        let body = r#"{
            "id": "resp_1",
            "status": "completed",
            "output": [
                {"type": "reasoning", "id": "rs_1", "summary": []},
                {"type": "message", "id": "msg_1", "role": "assistant",
                 "content": [{"type": "output_text", "text": "Checking.", "annotations": []}]},
                {"type": "function_call", "id": "fc_1", "call_id": "call_1",
                 "name": "list_files", "arguments": "{}", "status": "completed"}
            ],
            "usage": {"input_tokens": 120, "output_tokens": 30, "total_tokens": 150}
        }"#;

        let response = parse_response(body).unwrap();
        assert_eq!(
            response.output,
            vec![
                OutputItem::Text("Checking.".into()),
                OutputItem::ToolCall(ToolCall {
                    id: "call_1".into(),
                    name: "list_files".into(),
                    arguments: "{}".into(),
                }),
            ]
        );
        assert_eq!(response.usage.unwrap().total_tokens, 150);
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        let err = parse_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn body_carries_tools_and_replayed_items() {
        let registry = ToolRegistry::new();
        let schemas = registry.get_tool_schemas();
        let input = vec![
            Turn::user("list the files here"),
            Turn::ToolCallRequest {
                id: "call_1".into(),
                name: "list_files".into(),
                raw_arguments: "{}".into(),
            },
            Turn::tool_result("call_1", r#"["a.txt"]"#),
        ];
        let request = ModelRequest {
            model: "gpt-4o",
            instructions: Some("be brief"),
            input: &input,
            tools: &schemas,
            tool_choice: ToolChoice::Auto,
        };

        let body = build_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["instructions"], "be brief");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["name"], "list_files");
        assert_eq!(body["input"][0], json!({"role": "user", "content": "list the files here"}));
        assert_eq!(body["input"][1]["type"], "function_call");
        assert_eq!(body["input"][2]["type"], "function_call_output");
        assert_eq!(body["input"][2]["call_id"], "call_1");
    }

    #[test]
    fn retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "2.5".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(2500)));

        headers.insert("retry-after", "soon".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn retry_after_out_of_range_is_ignored() {
        let mut headers = HeaderMap::new();
        for value in ["99999999999999999999999", "1e30", "inf", "NaN"] {
            headers.insert("retry-after", value.parse().unwrap());
            assert_eq!(parse_retry_after(&headers), None, "value {value}");
        }
    }
}
