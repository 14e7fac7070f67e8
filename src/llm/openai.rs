//! OpenAI Assistants API (v2) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::AssistantConfig;
use crate::error::LlmError;
use crate::llm::provider::{
    AssistantService, AssistantSpec, ContentBlock, RequiredAction, Role, Run, RunError, RunStatus,
    ThreadMessage, ToolCall, ToolDefinition, ToolOutput,
};
use crate::llm::retry::{
    parse_retry_after, retry_backoff_delay, should_retry_status, should_retry_transport,
};

const PROVIDER: &str = "openai";
const MESSAGE_PAGE_SIZE: u32 = 20;

/// Assistants API client. One instance is shared by every run.
pub struct OpenAiAssistants {
    client: Client,
    config: AssistantConfig,
}

impl OpenAiAssistants {
    pub fn new(config: AssistantConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    async fn send_request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<R, LlmError> {
        let url = self.api_url(path);
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            tracing::debug!("Sending {} {} (attempt {})", method, url, attempt + 1);

            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(self.config.api_key.expose_secret())
                .header("OpenAI-Beta", "assistants=v2");
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt < max_retries && should_retry_transport(&method, e.is_connect()) {
                        let delay = retry_backoff_delay(attempt);
                        tracing::warn!(
                            "OpenAI request error (attempt {}/{}), retrying in {:?}: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay,
                            e,
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(LlmError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            let status = response.status();
            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            let response_text = response.text().await.unwrap_or_default();
            tracing::debug!("OpenAI response status: {}", status);

            if !status.is_success() {
                let status_code = status.as_u16();
                if status_code == 401 {
                    return Err(LlmError::AuthFailed {
                        provider: PROVIDER.to_string(),
                    });
                }

                if should_retry_status(&method, status_code) && attempt < max_retries {
                    let delay = retry_after.unwrap_or_else(|| retry_backoff_delay(attempt));
                    tracing::warn!(
                        "OpenAI returned HTTP {} (attempt {}/{}), retrying in {:?}",
                        status_code,
                        attempt + 1,
                        max_retries + 1,
                        delay,
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                if status_code == 429 {
                    return Err(LlmError::RateLimited {
                        provider: PROVIDER.to_string(),
                        retry_after,
                    });
                }
                return Err(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("HTTP {}: {}", status, api_error_message(&response_text)),
                });
            }

            return serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("JSON parse error: {e}. Raw: {response_text}"),
            });
        }

        Err(LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: "retry loop exited unexpectedly".to_string(),
        })
    }
}

#[async_trait]
impl AssistantService for OpenAiAssistants {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, LlmError> {
        let tools: Vec<Value> = spec
            .tools
            .iter()
            .map(ToolDefinition::to_function_json)
            .collect();
        let body = json!({
            "model": spec.model,
            "name": spec.name,
            "instructions": spec.instructions,
            "tools": tools,
        });
        let created: IdOnly = self
            .send_request(Method::POST, "assistants", Some(&body))
            .await?;
        Ok(created.id)
    }

    async fn create_thread(&self) -> Result<String, LlmError> {
        let created: IdOnly = self
            .send_request(Method::POST, "threads", Some(&json!({})))
            .await?;
        Ok(created.id)
    }

    async fn add_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), LlmError> {
        let body = json!({ "role": role.as_str(), "content": content });
        let _: IdOnly = self
            .send_request(
                Method::POST,
                &format!("threads/{thread_id}/messages"),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, LlmError> {
        let body = json!({ "assistant_id": assistant_id });
        let run: RunObject = self
            .send_request(Method::POST, &format!("threads/{thread_id}/runs"), Some(&body))
            .await?;
        run.into_run()
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, LlmError> {
        let run: RunObject = self
            .send_request(Method::GET, &format!("threads/{thread_id}/runs/{run_id}"), None)
            .await?;
        run.into_run()
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, LlmError> {
        let tool_outputs: Vec<ToolOutputBody<'_>> = outputs
            .iter()
            .map(|o| ToolOutputBody {
                tool_call_id: &o.tool_call_id,
                output: &o.output,
            })
            .collect();
        let body = json!({ "tool_outputs": tool_outputs });
        let run: RunObject = self
            .send_request(
                Method::POST,
                &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
                Some(&body),
            )
            .await?;
        run.into_run()
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, LlmError> {
        let list: MessageList = self
            .send_request(
                Method::GET,
                &format!("threads/{thread_id}/messages?order=desc&limit={MESSAGE_PAGE_SIZE}"),
                None,
            )
            .await?;
        Ok(list.data.into_iter().filter_map(MessageObject::into_message).collect())
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Serialize)]
struct ToolOutputBody<'a> {
    tool_call_id: &'a str,
    output: &'a str,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    thread_id: String,
    status: String,
    #[serde(default)]
    required_action: Option<RequiredActionObject>,
    #[serde(default)]
    last_error: Option<LastErrorObject>,
}

#[derive(Deserialize)]
struct RequiredActionObject {
    #[serde(default)]
    submit_tool_outputs: Option<SubmitToolOutputsObject>,
}

#[derive(Deserialize)]
struct SubmitToolOutputsObject {
    #[serde(default)]
    tool_calls: Vec<ToolCallObject>,
}

#[derive(Deserialize)]
struct ToolCallObject {
    id: String,
    function: FunctionObject,
}

#[derive(Deserialize)]
struct FunctionObject {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct LastErrorObject {
    code: Option<String>,
    message: Option<String>,
}

impl RunObject {
    fn into_run(self) -> Result<Run, LlmError> {
        let status = RunStatus::parse(&self.status).ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("unknown run status '{}'", self.status),
        })?;
        let required_action = self
            .required_action
            .and_then(|action| action.submit_tool_outputs)
            .map(|submit| RequiredAction {
                tool_calls: submit
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect(),
            });
        Ok(Run {
            id: self.id,
            thread_id: self.thread_id,
            status,
            required_action,
            last_error: self.last_error.map(|e| RunError {
                code: e.code,
                message: e.message,
            }),
        })
    }
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    id: String,
    role: String,
    #[serde(default)]
    content: Vec<Value>,
}

impl MessageObject {
    fn into_message(self) -> Option<ThreadMessage> {
        let role = match self.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => {
                tracing::debug!(role = other, "Skipping message with unknown role");
                return None;
            }
        };
        let content = self.content.iter().map(content_block).collect();
        Some(ThreadMessage {
            id: self.id,
            role,
            content,
        })
    }
}

fn content_block(block: &Value) -> ContentBlock {
    let kind = block["type"].as_str().unwrap_or("unknown");
    match (kind, block["text"]["value"].as_str()) {
        ("text", Some(value)) => ContentBlock::Text(value.to_string()),
        _ => ContentBlock::Other(kind.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_object_with_tool_calls() {
        let raw = json!({
            "id": "run_abc",
            "object": "thread.run",
            "thread_id": "thread_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "get_balance", "arguments": "{\"address\":\"0x00\"}" }
                    }]
                }
            },
            "last_error": null
        });
        let run = serde_json::from_value::<RunObject>(raw).unwrap().into_run().unwrap();

        assert_eq!(run.status, RunStatus::RequiresAction);
        let calls = run.pending_tool_calls().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_balance");
        assert_eq!(calls[0].arguments, "{\"address\":\"0x00\"}");
    }

    #[test]
    fn test_run_object_unknown_status_is_invalid() {
        let raw = json!({ "id": "run_1", "thread_id": "t", "status": "paused" });
        let err = serde_json::from_value::<RunObject>(raw).unwrap().into_run().unwrap_err();
        assert!(err.to_string().contains("paused"));
    }

    #[test]
    fn test_failed_run_keeps_last_error() {
        let raw = json!({
            "id": "run_1",
            "thread_id": "t",
            "status": "failed",
            "last_error": { "code": "server_error", "message": "boom" }
        });
        let run = serde_json::from_value::<RunObject>(raw).unwrap().into_run().unwrap();
        let error = run.last_error.unwrap();
        assert_eq!(error.message.as_deref(), Some("boom"));
        assert_eq!(error.code.as_deref(), Some("server_error"));
    }

    #[test]
    fn test_message_content_blocks() {
        let raw = json!({
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [{ "type": "text", "text": { "value": "Done", "annotations": [] } }]
                },
                {
                    "id": "msg_1",
                    "role": "user",
                    "content": [{ "type": "image_file", "image_file": { "file_id": "f" } }]
                }
            ]
        });
        let list: MessageList = serde_json::from_value(raw).unwrap();
        let messages: Vec<_> = list.data.into_iter().filter_map(MessageObject::into_message).collect();

        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content[0], ContentBlock::Text("Done".to_string()));
        assert_eq!(messages[1].content[0], ContentBlock::Other("image_file".to_string()));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"message":"No thread found","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "No thread found");
        assert_eq!(api_error_message("gateway timeout"), "gateway timeout");
    }

    mod http {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        use axum::Json;
        use axum::http::{StatusCode, header};
        use axum::routing::{get, post};
        use secrecy::SecretString;

        use super::*;

        async fn serve(app: axum::Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}")
        }

        fn client(base_url: String) -> OpenAiAssistants {
            OpenAiAssistants::new(AssistantConfig {
                api_key: SecretString::from("sk-test".to_string()),
                base_url,
                model: "gpt-4o".to_string(),
                name: "AIAgent".to_string(),
                assistant_id: None,
                max_retries: 2,
            })
            .unwrap()
        }

        fn run_json(status: &str) -> Value {
            json!({ "id": "run_1", "thread_id": "thread_1", "status": status })
        }

        #[tokio::test]
        async fn test_tool_outputs_not_resubmitted_after_server_error() {
            let hits = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&hits);
            let app = axum::Router::new().route(
                "/threads/{thread}/runs/{run}/submit_tool_outputs",
                post(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        (StatusCode::BAD_GATEWAY, "upstream hiccup")
                    }
                }),
            );
            let service = client(serve(app).await);

            let outputs = [ToolOutput {
                tool_call_id: "call_1".to_string(),
                output: "Swap executed successfully. Tx hash: 0xabc".to_string(),
            }];
            let err = service
                .submit_tool_outputs("thread_1", "run_1", &outputs)
                .await
                .unwrap_err();

            assert!(matches!(err, LlmError::RequestFailed { .. }), "{err:?}");
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_create_run_retries_rate_limit() {
            let hits = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&hits);
            let app = axum::Router::new().route(
                "/threads/{thread}/runs",
                post(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        let status = if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            StatusCode::TOO_MANY_REQUESTS
                        } else {
                            StatusCode::OK
                        };
                        (status, [(header::RETRY_AFTER, "0")], Json(run_json("queued")))
                    }
                }),
            );
            let service = client(serve(app).await);

            let run = service.create_run("thread_1", "asst_1").await.unwrap();
            assert_eq!(run.status, RunStatus::Queued);
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_retrieve_run_retries_server_error() {
            let hits = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&hits);
            let app = axum::Router::new().route(
                "/threads/{thread}/runs/{run}",
                get(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        let status = if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            StatusCode::SERVICE_UNAVAILABLE
                        } else {
                            StatusCode::OK
                        };
                        (status, Json(run_json("completed")))
                    }
                }),
            );
            let service = client(serve(app).await);

            let run = service.retrieve_run("thread_1", "run_1").await.unwrap();
            assert_eq!(run.status, RunStatus::Completed);
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }
    }
}
