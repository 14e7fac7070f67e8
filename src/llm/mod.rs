//! Assistant service integration.
//!
//! The planner is an OpenAI assistant. [`AssistantService`] is the seam the
//! agent drives; [`OpenAiAssistants`] speaks the HTTP API.

mod openai;
mod provider;
mod retry;

pub use openai::OpenAiAssistants;
pub use provider::{
    AssistantService, AssistantSpec, ContentBlock, RequiredAction, Role, Run, RunError, RunStatus,
    ThreadMessage, ToolCall, ToolDefinition, ToolOutput,
};

use std::sync::Arc;

use crate::config::AssistantConfig;
use crate::error::LlmError;

/// Build the assistant service from configuration.
pub fn create_assistant_service(
    config: &AssistantConfig,
) -> Result<Arc<dyn AssistantService>, LlmError> {
    tracing::info!(base_url = %config.base_url, model = %config.model, "Using OpenAI Assistants API");
    Ok(Arc::new(OpenAiAssistants::new(config.clone())?))
}

/// Reuse the configured assistant or create a new one from `spec`.
pub async fn ensure_assistant(
    service: &dyn AssistantService,
    config: &AssistantConfig,
    spec: &AssistantSpec,
) -> Result<String, LlmError> {
    if let Some(id) = &config.assistant_id {
        tracing::info!(assistant_id = %id, "Reusing configured assistant");
        return Ok(id.clone());
    }
    let id = service.create_assistant(spec).await?;
    tracing::info!(assistant_id = %id, tools = spec.tools.len(), "Created assistant");
    Ok(id)
}
