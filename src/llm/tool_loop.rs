//! Function-calling loop shared by the tool agents.
//!
//! The model is called repeatedly; whenever it requests tools, each call is
//! dispatched through the [`ToolSet`] and the results are appended as tool
//! responses. The loop ends when the model answers in plain text or the
//! iteration limit is hit.

use genai::chat::{ChatMessage, ChatRequest, ToolResponse};

use super::{ChatModel, ToolSet};
use crate::error::AgentError;

/// A tool call made during a loop run, for display and transcript logging.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolCallRecord {
    pub fn_name: String,
    pub arguments: serde_json::Value,
    pub result_summary: String,
}

#[derive(Debug, Clone)]
pub struct ToolLoopOutcome {
    pub answer: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
}

const RESULT_SUMMARY_CHARS: usize = 200;

pub async fn run_tool_loop(
    model: &dyn ChatModel,
    tools: &dyn ToolSet,
    system_prompt: &str,
    user_input: &str,
    temperature: f64,
    max_iterations: usize,
) -> Result<ToolLoopOutcome, AgentError> {
    let mut chat_req = ChatRequest::new(vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_input),
    ])
    .with_tools(tools.definitions());

    let mut records = Vec::new();

    for iteration in 1..=max_iterations {
        let turn = model.complete(chat_req.clone(), temperature).await?;

        if turn.tool_calls.is_empty() {
            let answer = turn.text.ok_or(AgentError::EmptyResponse)?;
            tracing::debug!(iteration, tool_calls = records.len(), "Tool loop finished");
            return Ok(ToolLoopOutcome {
                answer,
                tool_calls: records,
                iterations: iteration,
            });
        }

        chat_req = chat_req.append_message(ChatMessage::from(turn.tool_calls.clone()));

        for call in &turn.tool_calls {
            tracing::info!(
                tool = %call.fn_name,
                args = %call.fn_arguments,
                iteration,
                "Dispatching tool call"
            );
            let result = tools.dispatch(call).await;

            records.push(ToolCallRecord {
                fn_name: call.fn_name.clone(),
                arguments: call.fn_arguments.clone(),
                result_summary: summarize(&result),
            });

            chat_req = chat_req.append_message(ToolResponse::new(call.call_id.clone(), result));
        }
    }

    tracing::warn!(max_iterations, "Tool loop hit iteration limit");
    Err(AgentError::IterationLimit {
        limit: max_iterations,
    })
}

fn summarize(result: &str) -> String {
    if result.chars().count() > RESULT_SUMMARY_CHARS {
        let head: String = result.chars().take(RESULT_SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        result.to_string()
    }
}
