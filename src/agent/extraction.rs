//! Turning a settled run into the text shown to the user.

use crate::error::LlmError;
use crate::llm::{AssistantService, ContentBlock, Role, Run, RunStatus};

pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const NO_RESPONSE: &str = "No response from assistant";

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Text(String),
    /// The assistant answered with something other than text.
    NonText,
}

/// Extract the result of a settled run.
///
/// A failed run yields its error message (or [`UNKNOWN_ERROR`]) and records an
/// assistant message about it in the thread. Otherwise the newest assistant
/// message's first content block is returned.
pub async fn extract_result(
    service: &dyn AssistantService,
    run: &Run,
) -> Result<RunResult, LlmError> {
    if run.status == RunStatus::Failed {
        let message = run
            .last_error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.is_empty())
            .unwrap_or(UNKNOWN_ERROR)
            .to_string();
        tracing::warn!(run_id = %run.id, error = %message, "Run failed");

        let note = format!("I encountered an error: {message}");
        if let Err(e) = service
            .add_message(&run.thread_id, Role::Assistant, &note)
            .await
        {
            tracing::error!(thread_id = %run.thread_id, "Failed to record run error in thread: {}", e);
        }
        return Ok(RunResult::Text(message));
    }

    if run.status != RunStatus::Completed {
        tracing::warn!(run_id = %run.id, status = %run.status, "Run ended without completing");
    }

    let messages = service.list_messages(&run.thread_id).await?;
    let Some(reply) = messages.iter().find(|m| m.role == Role::Assistant) else {
        return Ok(RunResult::Text(NO_RESPONSE.to_string()));
    };
    Ok(match reply.content.first() {
        Some(ContentBlock::Text(text)) => RunResult::Text(text.clone()),
        _ => RunResult::NonText,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAssistant;

    async fn settled(service: &ScriptedAssistant) -> Run {
        service.create_run("thread_1", "asst").await.unwrap()
    }

    #[tokio::test]
    async fn test_failed_without_detail_is_unknown_error() {
        let service = ScriptedAssistant::new().then_fail(None);
        let run = settled(&service).await;

        let result = extract_result(&service, &run).await.unwrap();
        assert_eq!(result, RunResult::Text("Unknown error".to_string()));

        let messages = service.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, "I encountered an error: Unknown error");
    }

    #[tokio::test]
    async fn test_failed_with_detail() {
        let service = ScriptedAssistant::new().then_fail(Some("rate limit exceeded"));
        let run = settled(&service).await;

        let result = extract_result(&service, &run).await.unwrap();
        assert_eq!(result, RunResult::Text("rate limit exceeded".to_string()));
    }

    #[tokio::test]
    async fn test_failed_result_survives_history_write_failure() {
        let service = ScriptedAssistant::new()
            .then_fail(Some("boom"))
            .failing_assistant_messages();
        let run = settled(&service).await;

        let result = extract_result(&service, &run).await.unwrap();
        assert_eq!(result, RunResult::Text("boom".to_string()));
        assert!(service.messages().is_empty());
    }

    #[tokio::test]
    async fn test_completed_returns_latest_assistant_text() {
        let service = ScriptedAssistant::new()
            .then(RunStatus::Completed)
            .with_reply("Swap done");
        service
            .add_message("thread_1", Role::User, "swap 5 YU to YBTC")
            .await
            .unwrap();
        let run = settled(&service).await;

        let result = extract_result(&service, &run).await.unwrap();
        assert_eq!(result, RunResult::Text("Swap done".to_string()));
    }

    #[tokio::test]
    async fn test_completed_without_assistant_message() {
        let service = ScriptedAssistant::new().then(RunStatus::Completed);
        service
            .add_message("thread_1", Role::User, "hello")
            .await
            .unwrap();
        let run = settled(&service).await;

        let result = extract_result(&service, &run).await.unwrap();
        assert_eq!(result, RunResult::Text(NO_RESPONSE.to_string()));
    }

    #[tokio::test]
    async fn test_non_text_reply() {
        let service = ScriptedAssistant::new()
            .then(RunStatus::Completed)
            .with_non_text_reply();
        let run = settled(&service).await;

        assert_eq!(
            extract_result(&service, &run).await.unwrap(),
            RunResult::NonText
        );
    }
}
