//! Waiting out transient run states.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AgentConfig;
use crate::error::{Error, JobError};
use crate::llm::{AssistantService, Run};

/// Re-fetches a run at a fixed interval until it leaves `queued`/`in_progress`.
#[derive(Clone)]
pub struct RunPoller {
    service: Arc<dyn AssistantService>,
    interval: Duration,
    max_attempts: u32,
}

impl RunPoller {
    pub fn new(service: Arc<dyn AssistantService>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            service,
            interval,
            max_attempts,
        }
    }

    pub fn from_config(service: Arc<dyn AssistantService>, config: &AgentConfig) -> Self {
        Self::new(service, config.poll_interval, config.max_poll_attempts)
    }

    /// Wait until `run` is no longer transient and return its settled state.
    ///
    /// Fails with [`JobError::PollTimeout`] after `max_attempts` waits.
    pub async fn await_settled(&self, mut run: Run) -> Result<Run, Error> {
        let mut waits = 0u32;
        while run.status.is_transient() {
            if waits >= self.max_attempts {
                tracing::warn!(run_id = %run.id, status = %run.status, waits, "Run did not settle");
                return Err(JobError::PollTimeout {
                    run_id: run.id,
                    status: run.status.to_string(),
                    attempts: waits,
                    waited: self.interval * waits,
                }
                .into());
            }
            tokio::time::sleep(self.interval).await;
            waits += 1;
            run = self.service.retrieve_run(&run.thread_id, &run.id).await?;
            tracing::debug!(run_id = %run.id, status = %run.status, waits, "Polled run");
        }
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RunStatus;
    use crate::testing::ScriptedAssistant;

    const INTERVAL: Duration = Duration::from_millis(1000);

    async fn start(service: &Arc<ScriptedAssistant>) -> Run {
        service.create_run("thread_1", "asst").await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_once_per_transient_status() {
        let service = Arc::new(
            ScriptedAssistant::new()
                .then(RunStatus::Queued)
                .then(RunStatus::InProgress)
                .then(RunStatus::Completed),
        );
        let poller = RunPoller::new(service.clone(), INTERVAL, 600);

        let started = tokio::time::Instant::now();
        let run = poller.await_settled(start(&service).await).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(service.retrievals(), 2);
        assert_eq!(started.elapsed(), INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_run_returns_without_waiting() {
        let service = Arc::new(ScriptedAssistant::new().then(RunStatus::RequiresAction));
        let poller = RunPoller::new(service.clone(), INTERVAL, 600);

        let run = poller.await_settled(start(&service).await).await.unwrap();
        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(service.retrievals(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        // The last scripted step repeats, so the run stays in progress.
        let service = Arc::new(ScriptedAssistant::new().then(RunStatus::InProgress));
        let poller = RunPoller::new(service.clone(), INTERVAL, 3);

        let err = poller.await_settled(start(&service).await).await.unwrap_err();
        match err {
            Error::Job(JobError::PollTimeout {
                attempts, status, ..
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(status, "in_progress");
            }
            other => panic!("expected PollTimeout, got {other:?}"),
        }
        assert_eq!(service.retrievals(), 3);
    }
}
