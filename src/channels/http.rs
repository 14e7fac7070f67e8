//! HTTP webhook channel for receiving commands via HTTP POST.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::config::HttpConfig;
use crate::error::ChannelError;

/// How long a `wait_for_response` request blocks before giving up.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP webhook channel.
pub struct HttpChannel {
    config: HttpConfig,
    state: Arc<HttpChannelState>,
}

struct HttpChannelState {
    webhook_secret: Option<SecretString>,
    /// Content without this prefix is never answered, so it is refused up front.
    command_prefix: String,
    /// Sender for incoming messages.
    tx: RwLock<Option<mpsc::Sender<IncomingMessage>>>,
    /// Pending responses keyed by message ID.
    pending_responses: RwLock<HashMap<Uuid, oneshot::Sender<String>>>,
    /// Server shutdown signal.
    shutdown_tx: RwLock<Option<oneshot::Sender<()>>>,
}

impl HttpChannel {
    pub fn new(config: HttpConfig, command_prefix: impl Into<String>) -> Self {
        let state = Arc::new(HttpChannelState {
            webhook_secret: config.webhook_secret.clone(),
            command_prefix: command_prefix.into(),
            tx: RwLock::new(None),
            pending_responses: RwLock::new(HashMap::new()),
            shutdown_tx: RwLock::new(None),
        });
        Self { config, state }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/webhook", post(webhook_handler))
            .with_state(Arc::clone(&self.state))
    }
}

#[derive(Debug, Deserialize)]
struct WebhookRequest {
    /// Caller identifier; plays the role of the chat user.
    user_id: String,
    content: String,
    /// Must match `HTTP_WEBHOOK_SECRET` when one is configured.
    secret: Option<String>,
    /// Block until the agent replies.
    #[serde(default)]
    wait_for_response: bool,
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    message_id: Uuid,
    status: String,
    /// Reply text (only if `wait_for_response` was set).
    response: Option<String>,
}

impl WebhookResponse {
    fn error(message_id: Uuid, reason: &str) -> Self {
        Self {
            message_id,
            status: "error".to_string(),
            response: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    channel: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        channel: "http".to_string(),
    })
}

async fn webhook_handler(
    State(state): State<Arc<HttpChannelState>>,
    Json(req): Json<WebhookRequest>,
) -> (StatusCode, Json<WebhookResponse>) {
    let msg = IncomingMessage::new("http", &req.user_id, &req.content);

    if let Some(expected) = &state.webhook_secret
        && req.secret.as_deref() != Some(expected.expose_secret())
    {
        tracing::warn!(user_id = %req.user_id, "Rejected webhook with bad secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse::error(msg.id, "Invalid webhook secret")),
        );
    }

    if !req.content.starts_with(state.command_prefix.as_str()) {
        let reason = format!(
            "Not a command; content must start with '{}'",
            state.command_prefix
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(WebhookResponse::error(msg.id, &reason)),
        );
    }

    process_message(state, msg, req.wait_for_response).await
}

async fn process_message(
    state: Arc<HttpChannelState>,
    msg: IncomingMessage,
    wait_for_response: bool,
) -> (StatusCode, Json<WebhookResponse>) {
    let msg_id = msg.id;

    let response_rx = if wait_for_response {
        let (tx, rx) = oneshot::channel();
        state.pending_responses.write().await.insert(msg_id, tx);
        Some(rx)
    } else {
        None
    };

    let tx_guard = state.tx.read().await;
    let Some(tx) = tx_guard.as_ref() else {
        state.pending_responses.write().await.remove(&msg_id);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(WebhookResponse::error(msg_id, "Channel not started")),
        );
    };
    if tx.send(msg).await.is_err() {
        drop(tx_guard);
        state.pending_responses.write().await.remove(&msg_id);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WebhookResponse::error(msg_id, "Channel closed")),
        );
    }
    drop(tx_guard);

    let response = match response_rx {
        Some(rx) => Some(match tokio::time::timeout(RESPONSE_TIMEOUT, rx).await {
            Ok(Ok(content)) => content,
            Ok(Err(_)) => "Response cancelled".to_string(),
            Err(_) => {
                state.pending_responses.write().await.remove(&msg_id);
                "Response timeout".to_string()
            }
        }),
        None => None,
    };

    (
        StatusCode::OK,
        Json(WebhookResponse {
            message_id: msg_id,
            status: "accepted".to_string(),
            response,
        }),
    )
}

#[async_trait]
impl Channel for HttpChannel {
    fn name(&self) -> &str {
        "http"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ChannelError::StartupFailed {
                name: "http".to_string(),
                reason: format!("invalid listen address: {e}"),
            })?;
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            ChannelError::StartupFailed {
                name: "http".to_string(),
                reason: format!("bind {addr}: {e}"),
            }
        })?;

        let (tx, rx) = mpsc::channel(256);
        *self.state.tx.write().await = Some(tx);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.state.shutdown_tx.write().await = Some(shutdown_tx);

        let app = self.router();
        tokio::spawn(async move {
            tracing::info!("HTTP channel listening on {}", addr);
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("HTTP channel shutting down");
                })
                .await;
            if let Err(e) = served {
                tracing::error!("HTTP channel server error: {}", e);
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if let Some(tx) = self.state.pending_responses.write().await.remove(&msg.id) {
            let _ = tx.send(response.content);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        if self.state.tx.read().await.is_some() {
            Ok(())
        } else {
            Err(ChannelError::HealthCheckFailed {
                name: "http".to_string(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        if let Some(tx) = self.state.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
        *self.state.tx.write().await = None;
        Ok(())
    }
}
