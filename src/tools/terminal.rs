//! Shell command execution tool.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use super::{required_str, Tool, ToolArgs, ToolError};

/// Output longer than this is truncated before it reaches the model.
const MAX_OUTPUT_CHARS: usize = 10_000;

/// Run a shell command. Requires operator confirmation.
pub struct RunBash {
    shell: String,
}

impl RunBash {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl Tool for RunBash {
    fn name(&self) -> &str {
        "run_bash"
    }

    fn description(&self) -> &str {
        "Run a bash command in the workspace directory and return its stdout and stderr. The operator must approve every command."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to run"
                }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    fn confirmation_subject(&self, args: &ToolArgs) -> Result<Option<String>, ToolError> {
        required_str(args, "command").map(|command| Some(command.to_string()))
    }

    async fn execute(&self, args: &ToolArgs, workspace: &Path) -> Result<String, ToolError> {
        let command = required_str(args, "command")?;

        tracing::info!("Executing command: {}", command);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ToolError::Execution {
                status: format!("failed to spawn {}", self.shell),
                stderr: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            let captured = if stderr.trim().is_empty() {
                stdout.trim_end()
            } else {
                stderr.trim_end()
            };
            return Err(ToolError::Execution {
                status,
                stderr: truncate(captured),
            });
        }

        let mut result = String::new();
        result.push_str("stdout:\n");
        result.push_str(&stdout);

        if !stderr.is_empty() {
            result.push_str("\nstderr:\n");
            result.push_str(&stderr);
        }

        Ok(truncate(&result))
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((cut, _)) => format!("{}\n... [output truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(cmd: &str) -> ToolArgs {
        let mut args = ToolArgs::new();
        args.insert("command".into(), Value::String(cmd.into()));
        args
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let output = RunBash::new("sh")
            .execute(&command("echo out; echo err >&2"), dir.path())
            .await
            .unwrap();

        assert!(output.starts_with("stdout:\nout\n"), "{}", output);
        assert!(output.contains("stderr:\nerr"), "{}", output);
    }

    #[tokio::test]
    async fn runs_inside_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("here.txt"), "").unwrap();

        let output = RunBash::new("sh")
            .execute(&command("ls"), dir.path())
            .await
            .unwrap();
        assert!(output.contains("here.txt"));
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunBash::new("sh")
            .execute(&command("echo broken >&2; exit 3"), dir.path())
            .await
            .unwrap_err();

        match err {
            ToolError::Execution { status, stderr } => {
                assert_eq!(status, "exit code 3");
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_shell_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunBash::new("definitely-not-a-shell-binary")
            .execute(&command("true"), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "execution");
    }

    #[test]
    fn confirmation_subject_is_the_exact_command() {
        let subject = RunBash::new("sh")
            .confirmation_subject(&command("rm -rf tmp"))
            .unwrap();
        assert_eq!(subject.as_deref(), Some("rm -rf tmp"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_OUTPUT_CHARS + 5);
        let cut = truncate(&long);
        assert!(cut.ends_with("[output truncated]"));
        assert_eq!(cut.chars().filter(|c| *c == 'é').count(), MAX_OUTPUT_CHARS);
        assert_eq!(truncate("short"), "short");
    }
}
