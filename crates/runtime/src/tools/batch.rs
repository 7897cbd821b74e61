//! Executing the tool calls of one model turn.

use super::{ToolCall, ToolHost, ToolResult};

/// Run `calls` in order and return one result per call.
///
/// Calls are independent: a failure is recorded in its own slot and the
/// remaining calls still run.
pub async fn execute_all<H: ToolHost>(host: &H, calls: &[ToolCall]) -> Vec<ToolResult> {
    let mut results = Vec::with_capacity(calls.len());

    for call in calls {
        let result = match host.execute(call).await {
            Ok(output) => ToolResult::Success {
                tool_call_id: call.id.clone(),
                output,
            },
            Err(error) => {
                tracing::warn!(tool = %call.name, id = %call.id, %error, "tool call failed");
                ToolResult::Failure {
                    tool_call_id: call.id.clone(),
                    error,
                }
            }
        };
        results.push(result);
    }

    results
}
