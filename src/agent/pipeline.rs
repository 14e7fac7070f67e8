//! One command, one thread, one run.

use std::sync::Arc;

use crate::error::Error;
use crate::llm::{AssistantService, Role};

use super::dispatcher::ToolDispatcher;
use super::extraction::{RunResult, extract_result};
use super::poller::RunPoller;

/// Drives a message through thread creation, the run, tool dispatch and
/// result extraction.
pub struct RunPipeline {
    service: Arc<dyn AssistantService>,
    assistant_id: String,
    poller: RunPoller,
    dispatcher: ToolDispatcher,
}

impl RunPipeline {
    pub fn new(
        service: Arc<dyn AssistantService>,
        assistant_id: impl Into<String>,
        poller: RunPoller,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            service,
            assistant_id: assistant_id.into(),
            poller,
            dispatcher,
        }
    }

    pub async fn run(&self, message: &str) -> Result<RunResult, Error> {
        let thread_id = self.service.create_thread().await?;
        self.service
            .add_message(&thread_id, Role::User, message)
            .await?;

        let run = self
            .service
            .create_run(&thread_id, &self.assistant_id)
            .await?;
        tracing::debug!(run_id = %run.id, thread_id = %thread_id, "Run created");

        let run = self.poller.await_settled(run).await?;
        let run = self.dispatcher.resolve_actions(run).await?;
        tracing::debug!(run_id = %run.id, status = %run.status, "Run settled");

        Ok(extract_result(self.service.as_ref(), &run).await?)
    }
}
