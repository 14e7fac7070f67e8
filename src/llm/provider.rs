//! Assistant service abstraction.
//!
//! The planner is a hosted assistant that owns threads and runs. The agent only
//! holds identifiers and drives the run lifecycle through this trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Parse the wire form (`"in_progress"`, `"requires_action"`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "expired" => Self::Expired,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
        }
    }

    /// The service is still working; the run should be fetched again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation of the assistant against a thread.
#[derive(Debug, Clone)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    pub required_action: Option<RequiredAction>,
    pub last_error: Option<RunError>,
}

impl Run {
    /// Tool calls the run is blocked on, if any.
    pub fn pending_tool_calls(&self) -> Option<&[ToolCall]> {
        self.required_action
            .as_ref()
            .map(|action| action.tool_calls.as_slice())
            .filter(|calls| !calls.is_empty())
    }
}

/// Tool calls the run is waiting on.
#[derive(Debug, Clone, Default)]
pub struct RequiredAction {
    pub tool_calls: Vec<ToolCall>,
}

/// A request from the assistant to invoke one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments exactly as produced by the model.
    pub arguments: String,
}

/// The textual answer to one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct RunError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message stored in a thread.
#[derive(Debug, Clone)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    /// Non-text content (images, files); carries the block type.
    Other(String),
}

/// Schema of a tool the assistant may call.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Function-tool form accepted by the Assistants API.
    pub fn to_function_json(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Parameters used to create the long-lived assistant.
#[derive(Debug, Clone)]
pub struct AssistantSpec {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

/// Hosted assistant with threads and runs.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Register an assistant and return its identifier.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, LlmError>;

    /// Create an empty thread and return its identifier.
    async fn create_thread(&self) -> Result<String, LlmError>;

    /// Append a message to a thread.
    async fn add_message(&self, thread_id: &str, role: Role, content: &str)
    -> Result<(), LlmError>;

    /// Start a run of `assistant_id` on the thread.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, LlmError>;

    /// Fetch the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, LlmError>;

    /// Answer a `requires_action` run. All outputs go in one call.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, LlmError>;

    /// Messages in the thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, LlmError>;
}
