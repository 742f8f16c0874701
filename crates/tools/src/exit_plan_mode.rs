//! Exit-plan-mode tool: the model presents its plan and leaves planning.
//!
//! Gated like any other generic tool: approving the call is how the user
//! accepts the plan.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use serde_json::json;

pub struct ExitPlanModeTool;

#[async_trait]
impl ToolExecutor for ExitPlanModeTool {
    fn name(&self) -> &str {
        "exit_plan_mode"
    }

    fn description(&self) -> &str {
        "Present the finished plan to the user and leave plan mode. Call once the plan is complete."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "plan": { "type": "string", "description": "The plan, as markdown" }
            },
            "required": ["plan"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let plan = arguments["plan"]
            .as_str()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'plan' argument".into()))?;

        let steps = plan
            .lines()
            .filter(|l| {
                let l = l.trim_start();
                l.starts_with("- ") || l.starts_with("* ") || l.starts_with(|c: char| c.is_ascii_digit())
            })
            .count();

        Ok(ToolOutput::ok(format!("Plan accepted ({steps} step(s))"))
            .with_payload(json!({ "plan": plan, "steps": steps })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_plan_steps() {
        let output = ExitPlanModeTool
            .execute(json!({"plan": "# Plan\n1. read code\n2. fix bug\n- run tests"}))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.payload.unwrap()["steps"], 3);
    }

    #[tokio::test]
    async fn empty_plan_is_invalid() {
        let result = ExitPlanModeTool.execute(json!({"plan": "  "})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
