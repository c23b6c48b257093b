//! File inspection and mutation tools.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{optional_str, required_str, Tool, ToolArgs, ToolError};

/// Resolve a tool path against the workspace. Absolute paths are kept as-is.
fn resolve(workspace: &Path, path: &str) -> PathBuf {
    workspace.join(path)
}

/// List directory entries.
pub struct ListFiles;

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories at a given path. Returns a JSON array of entry names."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list, relative to the workspace (defaults to the workspace root)"
                }
            },
            "required": [],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &ToolArgs, workspace: &Path) -> Result<String, ToolError> {
        let path = optional_str(args, "path")?.unwrap_or(".");
        let dir = resolve(workspace, path);

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| ToolError::from_io(Path::new(path), e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::from_io(Path::new(path), e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(Value::from(names).to_string())
    }
}

/// Read a file's full contents.
pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the content of a file at a given path."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to read, relative to the workspace"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &ToolArgs, workspace: &Path) -> Result<String, ToolError> {
        let path = required_str(args, "path")?;
        fs::read_to_string(resolve(workspace, path))
            .await
            .map_err(|e| ToolError::from_io(Path::new(path), e))
    }
}

/// Create a new file. Refuses to overwrite.
pub struct CreateFile;

#[async_trait]
impl Tool for CreateFile {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a new file with the given content. Fails if the file already exists; use edit_file to change existing files."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to create, relative to the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &ToolArgs, workspace: &Path) -> Result<String, ToolError> {
        let path = required_str(args, "path")?;
        let content = required_str(args, "content")?;
        let target = resolve(workspace, path);

        let open = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await;
        let file = match open {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ToolError::AlreadyExists(PathBuf::from(path)))
            }
            Err(e) => return Err(ToolError::from_io(Path::new(path), e)),
        };

        write_or_discard(file, &target, content)
            .await
            .map_err(|e| ToolError::from_io(Path::new(path), e))?;

        tracing::debug!("Created {} ({} bytes)", target.display(), content.len());
        Ok(format!("File created: {}", path))
    }
}

/// Write `content` to a freshly created `target`. On failure the partial file
/// is removed so a retry does not hit `AlreadyExists`.
async fn write_or_discard<W>(mut writer: W, target: &Path, content: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written: std::io::Result<()> = async {
        writer.write_all(content.as_bytes()).await?;
        writer.flush().await
    }
    .await;
    drop(writer);

    if written.is_err() {
        if let Err(e) = fs::remove_file(target).await {
            tracing::warn!("Failed to remove partial file {}: {}", target.display(), e);
        }
    }
    written
}

/// Replace the first occurrence of a literal string in a file.
pub struct EditFile;

#[async_trait]
impl Tool for EditFile {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing the first occurrence of old_text with new_text. Fails if old_text is not present."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to edit, relative to the workspace"
                },
                "old_text": {
                    "type": "string",
                    "description": "Exact text to search for and replace"
                },
                "new_text": {
                    "type": "string",
                    "description": "Text to replace it with"
                }
            },
            "required": ["path", "old_text", "new_text"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: &ToolArgs, workspace: &Path) -> Result<String, ToolError> {
        let path = required_str(args, "path")?;
        let old_text = required_str(args, "old_text")?;
        let new_text = required_str(args, "new_text")?;

        if old_text.is_empty() {
            return Err(ToolError::InvalidArgument {
                name: "old_text".to_string(),
                reason: "must not be empty; use create_file for new files".to_string(),
            });
        }

        let target = resolve(workspace, path);
        let content = fs::read_to_string(&target)
            .await
            .map_err(|e| ToolError::from_io(Path::new(path), e))?;

        if !content.contains(old_text) {
            return Err(ToolError::NoMatch(PathBuf::from(path)));
        }

        let updated = content.replacen(old_text, new_text, 1);
        fs::write(&target, updated)
            .await
            .map_err(|e| ToolError::from_io(Path::new(path), e))?;

        Ok(format!("File edited: {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArgs {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    #[tokio::test]
    async fn list_files_defaults_to_workspace_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();

        let output = ListFiles.execute(&args(json!({})), dir.path()).await.unwrap();
        assert_eq!(output, r#"["a.txt","b.txt"]"#);
    }

    #[tokio::test]
    async fn list_files_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ListFiles
            .execute(&args(json!({"path": "nope"})), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_files_on_a_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "not a directory").unwrap();

        let err = ListFiles
            .execute(&args(json!({"path": "f"})), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[tokio::test]
    async fn read_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReadFile
            .execute(&args(json!({"path": "ghost.txt"})), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.to_string(), "ghost.txt does not exist");
    }

    #[tokio::test]
    async fn read_file_requires_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReadFile.execute(&args(json!({})), dir.path()).await.unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(name) if name == "path"));
    }

    #[tokio::test]
    async fn read_file_on_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let err = ReadFile
            .execute(&args(json!({"path": "sub"})), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "io");
    }

    #[tokio::test]
    async fn create_file_writes_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let call = args(json!({"path": "hello.txt", "content": "hi there"}));

        CreateFile.execute(&call, dir.path()).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("hello.txt")).unwrap(),
            "hi there"
        );

        let again = args(json!({"path": "hello.txt", "content": "clobber"}));
        let err = CreateFile.execute(&again, dir.path()).await.unwrap_err();
        assert!(matches!(err, ToolError::AlreadyExists(_)));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("hello.txt")).unwrap(),
            "hi there"
        );
    }

    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::Error::other("no space left on device")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("new.txt");
        std::fs::write(&target, "").unwrap();

        let err = write_or_discard(FailingWriter, &target, "data")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no space left on device");
        assert!(!target.exists());

        // A retry can create the file again.
        CreateFile
            .execute(&args(json!({"path": "new.txt", "content": "data"})), dir.path())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "data");
    }

    #[tokio::test]
    async fn create_file_requires_content() {
        let dir = tempfile::tempdir().unwrap();
        let err = CreateFile
            .execute(&args(json!({"path": "x.txt"})), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(name) if name == "content"));
    }

    #[tokio::test]
    async fn edit_file_replaces_first_occurrence_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "one two one").unwrap();

        EditFile
            .execute(
                &args(json!({"path": "f.txt", "old_text": "one", "new_text": "three"})),
                dir.path(),
            )
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "three two one"
        );
    }

    #[tokio::test]
    async fn edit_file_without_match_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "alpha").unwrap();

        let err = EditFile
            .execute(
                &args(json!({"path": "f.txt", "old_text": "beta", "new_text": "gamma"})),
                dir.path(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::NoMatch(_)));
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "alpha");
    }

    #[tokio::test]
    async fn edit_file_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EditFile
            .execute(
                &args(json!({"path": "gone.txt", "old_text": "a", "new_text": "b"})),
                dir.path(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn edit_file_rejects_empty_old_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "alpha").unwrap();
        let err = EditFile
            .execute(
                &args(json!({"path": "f.txt", "old_text": "", "new_text": "x"})),
                dir.path(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
}
