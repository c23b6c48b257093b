//! Model service failures and their classification.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("quota exhausted: {message}")]
    QuotaExceeded { message: String },

    #[error("rate limited{}: {message}", retry_hint(.retry_after))]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("model service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {:.0}s)", d.as_secs_f64().ceil()),
        None => String::new(),
    }
}

impl LlmError {
    /// Classify a non-success HTTP response from the model service.
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().map(|v| &v["error"]);
        let field = |name: &str| {
            error
                .and_then(|e| e[name].as_str())
                .map(str::to_string)
        };

        let message = field("message").unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(500).collect()
            }
        });
        let quota = [field("code"), field("type")]
            .iter()
            .flatten()
            .any(|c| c == "insufficient_quota");

        match status {
            401 | 403 => Self::Authentication { status, message },
            429 if quota => Self::QuotaExceeded { message },
            429 => Self::RateLimited {
                retry_after,
                message,
            },
            _ => Self::Api { status, message },
        }
    }

    /// Whether the loop may note the failure and try the model again.
    ///
    /// Authentication, quota and rate-limit failures end the task.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Authentication { .. } | Self::QuotaExceeded { .. } | Self::RateLimited { .. }
        )
    }
}
