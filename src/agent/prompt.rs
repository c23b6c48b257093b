//! Instructions sent with every model request.

use crate::tools::ToolRegistry;

/// Build the instructions with the workspace and tool list.
pub fn build_system_prompt(workspace_path: &str, tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a command-line assistant working on the operator's machine. Relative paths resolve against the workspace directory: {workspace_path}

## Tools
{tool_descriptions}

## Rules
1. Use tools to inspect the workspace instead of guessing.
2. Read a file before editing it. `edit_file` replaces the first exact match of `old_text`; `create_file` only creates new files.
3. Every `run_bash` command is shown to the operator, who may decline it. If a command is cancelled, do not retry it unchanged; propose an alternative or explain what you would need.
4. If a tool returns an error, read it and adjust your next step.
5. When the task is done, reply with a short summary of what you did and any files you changed."#,
        workspace_path = workspace_path,
        tool_descriptions = tool_descriptions
    )
}
