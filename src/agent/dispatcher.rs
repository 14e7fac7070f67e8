//! Tool dispatch for runs that require action.
//!
//! Every tool call in a `requires_action` round gets exactly one output, in
//! call order, and the outputs are submitted together. A failing or unknown
//! tool produces an `Error: ...` output instead of aborting the round.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::chain::ChainClient;
use crate::error::{Error, JobError};
use crate::llm::{AssistantService, Run, RunStatus, ToolCall, ToolOutput};
use crate::tools::ToolRegistry;

use super::poller::RunPoller;

/// Executes tool calls and feeds their outputs back to the run.
pub struct ToolDispatcher {
    service: Arc<dyn AssistantService>,
    registry: Arc<ToolRegistry>,
    chain: Arc<dyn ChainClient>,
    poller: RunPoller,
    max_rounds: usize,
}

impl ToolDispatcher {
    pub fn new(
        service: Arc<dyn AssistantService>,
        registry: Arc<ToolRegistry>,
        chain: Arc<dyn ChainClient>,
        poller: RunPoller,
        max_rounds: usize,
    ) -> Self {
        Self {
            service,
            registry,
            chain,
            poller,
            max_rounds,
        }
    }

    /// Answer tool calls until the run stops requiring action.
    ///
    /// A `requires_action` run without pending calls is returned unchanged.
    pub async fn resolve_actions(&self, mut run: Run) -> Result<Run, Error> {
        let mut rounds = 0usize;
        while run.status == RunStatus::RequiresAction {
            let Some(calls) = run.pending_tool_calls() else {
                tracing::warn!(run_id = %run.id, "Run requires action but has no tool calls");
                return Ok(run);
            };
            if rounds >= self.max_rounds {
                return Err(JobError::TooManyToolRounds {
                    run_id: run.id,
                    rounds,
                }
                .into());
            }
            rounds += 1;
            tracing::debug!(run_id = %run.id, round = rounds, calls = calls.len(), "Dispatching tool calls");

            let outputs = self.execute_calls(calls).await;
            let submitted = self
                .service
                .submit_tool_outputs(&run.thread_id, &run.id, &outputs)
                .await?;
            run = self.poller.await_settled(submitted).await?;
        }
        Ok(run)
    }

    /// Run every call concurrently; output order matches call order.
    pub async fn execute_calls(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        join_all(calls.iter().map(|call| self.execute_call(call))).await
    }

    async fn execute_call(&self, call: &ToolCall) -> ToolOutput {
        let output = match self.registry.get(&call.name) {
            None => {
                tracing::warn!(tool = %call.name, "Assistant requested an unknown tool");
                format!("Error: Tool \"{}\" not found.", call.name)
            }
            Some(tool) => match decode_arguments(&call.arguments) {
                Err(e) => format!("Error: {e}"),
                Ok(params) => match tool.invoke(params, self.chain.as_ref()).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(tool = %call.name, error = %e, "Tool failed");
                        format!("Error: {e}")
                    }
                },
            },
        };
        tracing::debug!(tool = %call.name, call_id = %call.id, "Tool call finished");
        ToolOutput {
            tool_call_id: call.id.clone(),
            output,
        }
    }
}

/// Parse model-produced argument text. Blank means no arguments.
fn decode_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}
