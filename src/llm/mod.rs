//! Model access seams.
//!
//! [`ChatModel`] and [`embeddings::Embedder`] are the only ways agents reach a
//! model, so tests substitute scripted fakes for both. [`ToolSet`] is the
//! seam between the tool loop and a concrete agent's tools.

pub mod client;
pub mod embeddings;
pub mod tool_loop;

use async_trait::async_trait;
use genai::chat::{ChatRequest, Tool, ToolCall};

use crate::error::AgentError;

pub use client::GenaiChatModel;
pub use embeddings::{Embedder, OpenAiEmbedder};
pub use tool_loop::{ToolCallRecord, ToolLoopOutcome, run_tool_loop};

/// Temperature used for general chat and retrieval answers.
pub const CHAT_TEMPERATURE: f64 = 0.3;

/// Temperature used by tool-calling agents.
pub const TOOL_TEMPERATURE: f64 = 0.0;

/// One model reply: optional text plus any requested tool calls.
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the request and return the model's reply.
    async fn complete(&self, request: ChatRequest, temperature: f64)
    -> Result<ChatTurn, AgentError>;

    fn model_name(&self) -> &str;
}

/// A set of function-calling tools exposed to the model.
///
/// `dispatch` never fails: errors are returned as `{"error": ...}` JSON so
/// the model can read them and react.
#[async_trait]
pub trait ToolSet: Send + Sync {
    fn definitions(&self) -> Vec<Tool>;

    async fn dispatch(&self, call: &ToolCall) -> String;
}

/// Read a required string argument from a tool call.
pub fn str_arg<'a>(call: &'a ToolCall, name: &str) -> Result<&'a str, String> {
    call.fn_arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("{}: missing or invalid '{}' argument", call.fn_name, name))
}

/// Read an optional string argument from a tool call.
pub fn opt_str_arg<'a>(call: &'a ToolCall, name: &str) -> Option<&'a str> {
    call.fn_arguments.get(name).and_then(|v| v.as_str())
}

/// Format a tool error the way every tool reports it.
pub fn tool_error(message: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}
