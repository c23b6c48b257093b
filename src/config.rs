//! Configuration management for the task agent.
//!
//! Configuration is read from environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the model service.
//! - `OPENAI_BASE_URL` - Optional. Base URL of the Responses API. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. The model to use. Defaults to `gpt-4o`.
//! - `WORKSPACE_PATH` - Optional. Directory tool paths resolve against. Defaults to current directory.
//! - `MAX_ITERATIONS` - Optional. Maximum model invocations per task. Defaults to `20`.
//! - `CONTEXT_WINDOW_TOKENS` - Optional. Token budget used for usage percentages. Defaults to `128000`.
//! - `AGENT_SHELL` - Optional. Shell program used by `run_bash`. Defaults to `bash`.
//! - `MODEL_TIMEOUT_SECS` - Optional. Per-request timeout for model calls. Defaults to `300`.
//!
//! Any of these may also come from a `.env` file (see [`load_env_file`]);
//! variables already set in the process environment take precedence.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
pub const DEFAULT_CONTEXT_WINDOW_TOKENS: u64 = 128_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model service API key
    pub api_key: String,

    /// Base URL of the Responses API (no trailing slash)
    pub base_url: String,

    /// Model identifier sent with every request
    pub default_model: String,

    /// Workspace directory for file operations
    pub workspace_path: PathBuf,

    /// Maximum model invocations per task
    pub max_iterations: usize,

    /// Context window budget the resource ledger reports against
    pub context_window_tokens: u64,

    /// Shell program `run_bash` invokes as `<shell> -c <command>`
    pub shell: String,

    /// Timeout applied to each model request
    pub model_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidValue("OPENAI_BASE_URL".to_string(), e.to_string()))?;

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let max_iterations = env_parse("MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let context_window_tokens =
            env_parse("CONTEXT_WINDOW_TOKENS", DEFAULT_CONTEXT_WINDOW_TOKENS)?;

        let shell = std::env::var("AGENT_SHELL").unwrap_or_else(|_| "bash".to_string());

        let model_timeout = Duration::from_secs(env_parse("MODEL_TIMEOUT_SECS", 300u64)?);

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model,
            workspace_path,
            max_iterations,
            context_window_tokens,
            shell,
            model_timeout,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String, workspace_path: PathBuf) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model,
            workspace_path,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            context_window_tokens: DEFAULT_CONTEXT_WINDOW_TOKENS,
            shell: "bash".to_string(),
            model_timeout: Duration::from_secs(300),
        }
    }
}

/// Load a `.env` file into the process environment without overriding
/// variables that are already set.
///
/// `None` searches the current directory and its parents. Returns the path
/// that was loaded, or `None` when there is no file.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue(".env".to_string(), e.to_string())),
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = Config::new("key".into(), "gpt-4o".into(), PathBuf::from("/tmp"));
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.context_window_tokens, 128_000);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.shell, "bash");
    }

    #[test]
    fn env_parse_falls_back_to_default() {
        let value: usize = env_parse("TASK_AGENT_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn env_parse_rejects_garbage() {
        std::env::set_var("TASK_AGENT_TEST_GARBAGE", "twenty");
        let err = env_parse::<usize>("TASK_AGENT_TEST_GARBAGE", 20).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "TASK_AGENT_TEST_GARBAGE"));
        std::env::remove_var("TASK_AGENT_TEST_GARBAGE");
    }

    #[test]
    fn env_file_fills_gaps_without_overriding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "TASK_AGENT_TEST_DOTENV_FILE=from_file\nTASK_AGENT_TEST_DOTENV_SET=from_file\n",
        )
        .unwrap();
        std::env::set_var("TASK_AGENT_TEST_DOTENV_SET", "from_env");

        let loaded = load_env_file(Some(&path)).unwrap();
        assert_eq!(loaded.as_deref(), Some(path.as_path()));
        assert_eq!(std::env::var("TASK_AGENT_TEST_DOTENV_FILE").unwrap(), "from_file");
        assert_eq!(std::env::var("TASK_AGENT_TEST_DOTENV_SET").unwrap(), "from_env");

        std::env::remove_var("TASK_AGENT_TEST_DOTENV_FILE");
        std::env::remove_var("TASK_AGENT_TEST_DOTENV_SET");
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_env_file(Some(&dir.path().join(".env"))).unwrap();
        assert_eq!(loaded, None);
    }
}
