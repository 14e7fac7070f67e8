//! Discord bot channel.
//!
//! Receives messages over Gateway v10 (websocket) and replies over REST.
//! Each gateway session is Hello, Identify, then a heartbeat loop running
//! alongside dispatch handling. Only `MESSAGE_CREATE` dispatches from human
//! authors become [`IncomingMessage`]s.
//!
//! A supervisor task owns the sessions. A lost connection, an unacknowledged
//! heartbeat or an op 9 reconnects with capped exponential backoff; op 7
//! reconnects at once. Only shutdown or a dropped receiver ends it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::config::DiscordConfig;
use crate::error::ChannelError;

/// Discord rejects message bodies longer than this (in characters).
pub const MAX_MESSAGE_CHARS: usize = 2000;

const INTENT_GUILDS: u64 = 1 << 0;
const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;
pub const GATEWAY_INTENTS: u64 = INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_MESSAGE_CONTENT;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Discord channel.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: reqwest::Client,
    shutdown: Arc<Notify>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }
}

fn gateway_error(reason: impl Into<String>) -> ChannelError {
    ChannelError::StartupFailed {
        name: "discord".to_string(),
        reason: reason.into(),
    }
}

/// Envelope of every gateway frame.
#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageCreate {
    id: String,
    channel_id: String,
    #[serde(default)]
    content: String,
    author: Author,
}

#[derive(Debug, Deserialize)]
struct Author {
    id: String,
    #[serde(default)]
    bot: bool,
}

fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "vaultclaw",
                "device": "vaultclaw",
            },
        },
    })
}

fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": seq })
}

/// Turn a `MESSAGE_CREATE` body into an incoming message. Bot authors and
/// empty messages yield `None`.
fn incoming_from_dispatch(d: &Value) -> Option<IncomingMessage> {
    let created: MessageCreate = match serde_json::from_value(d.clone()) {
        Ok(created) => created,
        Err(e) => {
            tracing::debug!("Skipping malformed MESSAGE_CREATE: {}", e);
            return None;
        }
    };
    if created.author.bot || created.content.trim().is_empty() {
        return None;
    }
    Some(
        IncomingMessage::new("discord", created.author.id, created.content).with_metadata(json!({
            "channel_id": created.channel_id,
            "message_id": created.id,
        })),
    )
}

/// Truncate to at most [`MAX_MESSAGE_CHARS`] characters.
fn truncate_message(content: &str) -> &str {
    match content.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

fn reply_body(content: &str, message_id: Option<&str>) -> Value {
    let mut body = json!({ "content": truncate_message(content) });
    if let Some(message_id) = message_id {
        body["message_reference"] = json!({ "message_id": message_id });
    }
    body
}

/// Backoff before reconnect attempt `failures` (0-based), doubling up to
/// [`RECONNECT_MAX_DELAY`].
fn reconnect_delay(failures: u32) -> Duration {
    RECONNECT_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(failures))
        .min(RECONNECT_MAX_DELAY)
}

/// Heartbeat acknowledgement tracking. A beat that is due while the previous
/// one is still unacknowledged means the connection is dead.
#[derive(Debug, Default)]
struct Heartbeat {
    awaiting_ack: bool,
}

impl Heartbeat {
    /// Returns `false` if the previous beat was never acknowledged.
    fn beat(&mut self) -> bool {
        if self.awaiting_ack {
            return false;
        }
        self.awaiting_ack = true;
        true
    }

    fn ack(&mut self) {
        self.awaiting_ack = false;
    }
}

/// How a gateway session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Shutdown was requested or the receiver is gone.
    Stopped,
    /// The gateway asked for a reconnect (op 7).
    ReconnectRequested,
    /// Connection dropped, heartbeat unacknowledged or session invalidated.
    Lost,
}

/// An identified gateway connection.
struct GatewaySession {
    ws: GatewayStream,
    heartbeat_interval: Duration,
}

impl GatewaySession {
    /// Connect, wait for Hello and send Identify.
    async fn open(config: &DiscordConfig) -> Result<Self, ChannelError> {
        let (mut ws, _) = tokio_tungstenite::connect_async(config.gateway_url.as_str())
            .await
            .map_err(|e| gateway_error(format!("gateway connect: {e}")))?;

        // The first frame must be Hello carrying the heartbeat interval.
        let hello = loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let payload: GatewayPayload = serde_json::from_str(&text)
                        .map_err(|e| gateway_error(format!("bad hello: {e}")))?;
                    break payload;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(gateway_error(e.to_string())),
                None => return Err(gateway_error("gateway closed before hello")),
            }
        };
        let interval_ms = match (hello.op, hello.d["heartbeat_interval"].as_u64()) {
            (OP_HELLO, Some(ms)) => ms.max(1),
            _ => return Err(gateway_error(format!("expected hello, got op {}", hello.op))),
        };

        let identify = identify_payload(config.bot_token.expose_secret());
        ws.send(WsMessage::Text(identify.to_string().into()))
            .await
            .map_err(|e| gateway_error(format!("identify: {e}")))?;

        Ok(Self {
            ws,
            heartbeat_interval: Duration::from_millis(interval_ms),
        })
    }

    /// Pump one session until it ends. `failures` is reset once the session
    /// reaches READY.
    async fn run(
        self,
        tx: &mpsc::Sender<IncomingMessage>,
        shutdown: &Notify,
        failures: &mut u32,
    ) -> SessionEnd {
        let (mut write, mut read) = self.ws.split();
        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        let mut heartbeat = Heartbeat::default();
        let mut seq: Option<u64> = None;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    return SessionEnd::Stopped;
                }
                _ = ticker.tick() => {
                    if !heartbeat.beat() {
                        tracing::warn!("Discord heartbeat not acknowledged");
                        return SessionEnd::Lost;
                    }
                    let beat = heartbeat_payload(seq).to_string();
                    if let Err(e) = write.send(WsMessage::Text(beat.into())).await {
                        tracing::warn!("Discord heartbeat failed: {}", e);
                        return SessionEnd::Lost;
                    }
                }
                frame = read.next() => {
                    let text = match frame {
                        Some(Ok(WsMessage::Text(text))) => text,
                        Some(Ok(WsMessage::Close(reason))) => {
                            tracing::warn!("Discord gateway closed: {:?}", reason);
                            return SessionEnd::Lost;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::warn!("Discord gateway error: {}", e);
                            return SessionEnd::Lost;
                        }
                        None => return SessionEnd::Lost,
                    };
                    let payload: GatewayPayload = match serde_json::from_str(&text) {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::debug!("Ignoring undecodable gateway frame: {}", e);
                            continue;
                        }
                    };
                    if payload.s.is_some() {
                        seq = payload.s;
                    }
                    match payload.op {
                        OP_DISPATCH => match payload.t.as_deref() {
                            Some("READY") => {
                                *failures = 0;
                                tracing::info!("Discord gateway ready");
                            }
                            Some("MESSAGE_CREATE") => {
                                if let Some(msg) = incoming_from_dispatch(&payload.d)
                                    && tx.send(msg).await.is_err()
                                {
                                    return SessionEnd::Stopped;
                                }
                            }
                            _ => {}
                        },
                        OP_HEARTBEAT => {
                            let beat = heartbeat_payload(seq).to_string();
                            let _ = write.send(WsMessage::Text(beat.into())).await;
                        }
                        OP_HEARTBEAT_ACK => heartbeat.ack(),
                        OP_RECONNECT => return SessionEnd::ReconnectRequested,
                        OP_INVALID_SESSION => {
                            tracing::warn!("Discord session invalidated");
                            return SessionEnd::Lost;
                        }
                        op => tracing::debug!(op, "Unhandled gateway op"),
                    }
                }
            }
        }
    }
}

/// Sleep for `delay` unless shutdown comes first. Returns `false` on shutdown.
async fn sleep_unless_shutdown(delay: Duration, shutdown: &Notify) -> bool {
    tokio::select! {
        _ = shutdown.notified() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Run sessions back to back, reconnecting until shutdown or until nobody is
/// listening for messages.
async fn supervise(
    first: GatewaySession,
    config: DiscordConfig,
    tx: mpsc::Sender<IncomingMessage>,
    shutdown: Arc<Notify>,
) {
    let mut next = Some(first);
    let mut failures: u32 = 0;

    while !tx.is_closed() {
        let session = match next.take() {
            Some(session) => session,
            None => match GatewaySession::open(&config).await {
                Ok(session) => session,
                Err(e) => {
                    let delay = reconnect_delay(failures);
                    failures = failures.saturating_add(1);
                    tracing::warn!(delay_ms = delay.as_millis() as u64, "Discord reconnect failed: {}", e);
                    if !sleep_unless_shutdown(delay, &shutdown).await {
                        break;
                    }
                    continue;
                }
            },
        };

        match session.run(&tx, &shutdown, &mut failures).await {
            SessionEnd::Stopped => break,
            SessionEnd::ReconnectRequested => {
                tracing::info!("Discord gateway requested reconnect");
            }
            SessionEnd::Lost => {
                let delay = reconnect_delay(failures);
                failures = failures.saturating_add(1);
                tracing::warn!(delay_ms = delay.as_millis() as u64, "Discord session lost; reconnecting");
                if !sleep_unless_shutdown(delay, &shutdown).await {
                    break;
                }
            }
        }
    }

    tracing::debug!("Discord gateway supervisor ended");
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        // The first session is opened here so bad tokens and URLs fail startup.
        let session = GatewaySession::open(&self.config).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(supervise(
            session,
            self.config.clone(),
            tx,
            Arc::clone(&self.shutdown),
        ));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let send_failed = |reason: String| ChannelError::SendFailed {
            name: "discord".to_string(),
            reason,
        };

        let channel_id = msg.metadata["channel_id"]
            .as_str()
            .ok_or_else(|| send_failed("message has no channel_id".to_string()))?;
        let message_id = msg.metadata["message_id"].as_str();

        let url = format!("{}/channels/{}/messages", self.config.api_base, channel_id);
        let resp = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bot {}", self.config.bot_token.expose_secret()),
            )
            .json(&reply_body(&response.content, message_id))
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(send_failed(format!("HTTP {status}: {body}")));
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        // A stored permit covers a supervisor that is between sessions.
        self.shutdown.notify_one();
        Ok(())
    }
}
