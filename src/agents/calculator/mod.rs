//! Calculator agent tools.
//!
//! The model never evaluates code on the host: its only tool is
//! `calculate`, backed by the arithmetic evaluator in [`eval`].

pub mod eval;

use async_trait::async_trait;
use genai::chat::{Tool, ToolCall};
use serde_json::json;

use crate::llm::{ToolSet, str_arg, tool_error};

pub use eval::{evaluate, format_number};

pub struct CalculatorTools;

#[async_trait]
impl ToolSet for CalculatorTools {
    fn definitions(&self) -> Vec<Tool> {
        vec![
            Tool::new("calculate")
                .with_description(
                    "Evaluate an arithmetic expression and return the numeric result. \
                     Supports + - * / // % ** ^, parentheses, the constants pi and e, and \
                     the functions sqrt, abs, ln, log10, exp, sin, cos, tan, floor, ceil, round. \
                     Angles are in radians. Returns JSON with the expression and its result.",
                )
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "expression": {
                            "type": "string",
                            "description": "The expression to evaluate, e.g. \"(3 + 4) * sqrt(2)\""
                        }
                    },
                    "required": ["expression"]
                })),
        ]
    }

    async fn dispatch(&self, call: &ToolCall) -> String {
        match call.fn_name.as_str() {
            "calculate" => {
                let expression = match str_arg(call, "expression") {
                    Ok(e) => e,
                    Err(e) => return tool_error(e),
                };
                calculate(expression)
            }
            other => tool_error(format!("Unknown tool: {other}")),
        }
    }
}

/// Evaluate `expression` and report the result as tool JSON.
pub fn calculate(expression: &str) -> String {
    match evaluate(expression) {
        Ok(value) => json!({
            "expression": expression,
            "result": format_number(value),
        })
        .to_string(),
        Err(e) => tool_error(format!("Error in calculation: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tool_call;

    #[tokio::test]
    async fn calculate_tool_returns_result() {
        let out = CalculatorTools
            .dispatch(&tool_call("calculate", json!({"expression": "6 * 7"})))
            .await;
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["result"], "42");
    }

    #[tokio::test]
    async fn errors_are_json_not_panics() {
        let out = CalculatorTools
            .dispatch(&tool_call("calculate", json!({"expression": "1/0"})))
            .await;
        assert!(out.contains("division by zero"));

        let out = CalculatorTools
            .dispatch(&tool_call("calculate", json!({})))
            .await;
        assert!(out.contains("missing or invalid 'expression'"));

        let out = CalculatorTools
            .dispatch(&tool_call("python_repl", json!({"code": "1"})))
            .await;
        assert!(out.contains("Unknown tool: python_repl"));
    }
}
