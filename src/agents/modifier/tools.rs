//! Function-calling tools over [`RepoModifier`].

use std::sync::Arc;

use async_trait::async_trait;
use genai::chat::{Tool, ToolCall};
use serde::Serialize;
use serde_json::json;

use super::ops::RepoModifier;
use crate::error::ModifierError;
use crate::llm::{ToolSet, opt_str_arg, str_arg, tool_error};

pub struct ModifierTools {
    modifier: Arc<RepoModifier>,
}

impl ModifierTools {
    pub fn new(modifier: Arc<RepoModifier>) -> Self {
        Self { modifier }
    }
}

fn to_json<T: Serialize>(result: Result<T, ModifierError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|e| tool_error(e)),
        Err(e) => tool_error(e),
    }
}

fn path_schema(extra: serde_json::Value, required: &[&str]) -> serde_json::Value {
    let mut properties = json!({
        "branch": {
            "type": "string",
            "description": "Branch to operate on (defaults to the repository's default branch)"
        }
    });
    if let (Some(props), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            props.insert(k.clone(), v.clone());
        }
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

#[async_trait]
impl ToolSet for ModifierTools {
    fn definitions(&self) -> Vec<Tool> {
        let file_path = json!({
            "type": "string",
            "description": "Path relative to the repository root, e.g. 'src/main.py'"
        });
        let commit_message = json!({ "type": "string", "description": "Commit message" });

        vec![
            Tool::new("list_files")
                .with_description(
                    "List files and directories at a path in the repository. An empty path \
                     lists the root.",
                )
                .with_schema(path_schema(
                    json!({ "path": { "type": "string", "description": "Directory path, empty for root" } }),
                    &[],
                )),
            Tool::new("read_file")
                .with_description(
                    "Read a file's contents. Paths are matched case-insensitively; close \
                     matches are suggested when the file is not found.",
                )
                .with_schema(path_schema(json!({ "file_path": file_path }), &["file_path"])),
            Tool::new("edit_file")
                .with_description(
                    "Replace the entire contents of an existing file and commit the change.",
                )
                .with_schema(path_schema(
                    json!({
                        "file_path": file_path,
                        "new_content": { "type": "string", "description": "Full new file content" },
                        "commit_message": commit_message,
                    }),
                    &["file_path", "new_content"],
                )),
            Tool::new("create_file")
                .with_description(
                    "Create a new file and commit it. Fails if the file already exists; use \
                     edit_file for existing files.",
                )
                .with_schema(path_schema(
                    json!({
                        "file_path": file_path,
                        "content": { "type": "string", "description": "File content" },
                        "commit_message": commit_message,
                    }),
                    &["file_path", "content"],
                )),
            Tool::new("delete_file")
                .with_description("Delete a file and commit the removal.")
                .with_schema(path_schema(
                    json!({ "file_path": file_path, "commit_message": commit_message }),
                    &["file_path"],
                )),
            Tool::new("search_files")
                .with_description("Search the repository's code by content or file name.")
                .with_schema(json!({
                    "type": "object",
                    "properties": { "query": { "type": "string", "description": "Search term" } },
                    "required": ["query"]
                })),
            Tool::new("find_file")
                .with_description("Find files by name, ignoring case. Partial names match.")
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "file_name": { "type": "string", "description": "File name or part of it" }
                    },
                    "required": ["file_name"]
                })),
            Tool::new("get_file_history")
                .with_description("List the most recent commits that touched a file.")
                .with_schema(json!({
                    "type": "object",
                    "properties": { "file_path": file_path },
                    "required": ["file_path"]
                })),
            Tool::new("create_branch")
                .with_description(
                    "Create a branch from the head of a base branch (default: the repository's \
                     default branch).",
                )
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "branch_name": { "type": "string", "description": "New branch name" },
                        "base_branch": { "type": "string", "description": "Branch to start from" }
                    },
                    "required": ["branch_name"]
                })),
        ]
    }

    async fn dispatch(&self, call: &ToolCall) -> String {
        let m = &self.modifier;
        let branch = opt_str_arg(call, "branch");
        let message = opt_str_arg(call, "commit_message");

        match call.fn_name.as_str() {
            "list_files" => {
                to_json(m.list_files(opt_str_arg(call, "path").unwrap_or(""), branch).await)
            }
            "read_file" => match str_arg(call, "file_path") {
                Ok(path) => to_json(m.read_file(path, branch).await),
                Err(e) => tool_error(e),
            },
            "edit_file" => match (str_arg(call, "file_path"), str_arg(call, "new_content")) {
                (Ok(path), Ok(content)) => {
                    to_json(m.edit_file(path, content, message, branch).await)
                }
                (Err(e), _) | (_, Err(e)) => tool_error(e),
            },
            "create_file" => match (str_arg(call, "file_path"), str_arg(call, "content")) {
                (Ok(path), Ok(content)) => {
                    to_json(m.create_file(path, content, message, branch).await)
                }
                (Err(e), _) | (_, Err(e)) => tool_error(e),
            },
            "delete_file" => match str_arg(call, "file_path") {
                Ok(path) => to_json(m.delete_file(path, message, branch).await),
                Err(e) => tool_error(e),
            },
            "search_files" => match str_arg(call, "query") {
                Ok(query) => to_json(m.search_files(query).await),
                Err(e) => tool_error(e),
            },
            "find_file" => match str_arg(call, "file_name") {
                Ok(name) => to_json(m.find_file(name).await),
                Err(e) => tool_error(e),
            },
            "get_file_history" => match str_arg(call, "file_path") {
                Ok(path) => to_json(m.file_history(path).await),
                Err(e) => tool_error(e),
            },
            "create_branch" => match str_arg(call, "branch_name") {
                Ok(name) => to_json(m.create_branch(name, opt_str_arg(call, "base_branch")).await),
                Err(e) => tool_error(e),
            },
            other => tool_error(format!("Unknown tool: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryRepo, tool_call};

    async fn tools() -> (Arc<InMemoryRepo>, ModifierTools) {
        let repo = Arc::new(InMemoryRepo::new("octo", "hello").with_file("README.md", "# Hi"));
        let modifier = RepoModifier::connect(repo.clone(), "octo/hello").await.unwrap();
        (repo, ModifierTools::new(Arc::new(modifier)))
    }

    #[tokio::test]
    async fn exposes_nine_operations() {
        let (_, t) = tools().await;
        assert_eq!(t.definitions().len(), 9);
    }

    #[tokio::test]
    async fn create_and_read_through_tools() {
        let (repo, t) = tools().await;
        let out = t
            .dispatch(&tool_call(
                "create_file",
                json!({"file_path": "bye.py", "content": "print('bye')"}),
            ))
            .await;
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["path"], "bye.py");
        assert_eq!(repo.file("bye.py").as_deref(), Some("print('bye')"));

        let out = t
            .dispatch(&tool_call("read_file", json!({"file_path": "BYE.py"})))
            .await;
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["content"], "print('bye')");
    }

    #[tokio::test]
    async fn failures_come_back_as_error_json() {
        let (_, t) = tools().await;
        let out = t
            .dispatch(&tool_call("create_file", json!({"file_path": "README.md", "content": "x"})))
            .await;
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(v["error"].as_str().unwrap().contains("already exists"));

        let out = t
            .dispatch(&tool_call("edit_file", json!({"file_path": "README.md"})))
            .await;
        assert!(out.contains("missing or invalid 'new_content'"));

        let out = t
            .dispatch(&tool_call("read_file", json!({"file_path": "docs"})))
            .await;
        assert!(out.contains("not a valid file path"));
    }
}
