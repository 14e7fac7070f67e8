//! Chat surfaces.
//!
//! Every channel turns its input into a stream of [`IncomingMessage`]s and
//! knows how to deliver an [`OutgoingResponse`] back to the message's origin.
//! [`ChannelManager`] merges the streams and routes replies by channel name.

mod discord;
mod http;
mod repl;

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

pub use discord::DiscordChannel;
pub use http::HttpChannel;
pub use repl::ReplChannel;

/// Stream of messages produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message received from a chat surface.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel that produced the message.
    pub channel: String,
    /// Caller identity, stable per user within the channel.
    pub user_id: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
    /// Channel-specific routing data (e.g. Discord channel and message ids).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            content: content.into(),
            received_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A reply to an [`IncomingMessage`].
#[derive(Debug, Clone)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name; must match [`IncomingMessage::channel`] of its messages.
    fn name(&self) -> &str;

    /// Start listening and return the message stream.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a reply to the origin of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Owns the enabled channels.
#[derive(Default)]
pub struct ChannelManager {
    channels: Vec<Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        tracing::info!("{} channel enabled", channel.name());
        self.channels.push(channel);
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Start every channel and merge their streams.
    ///
    /// Fails if any channel fails to start.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let stream = channel.start().await?;
            tracing::debug!(channel = channel.name(), "Channel started");
            streams.push(stream);
        }
        for (name, e) in self.unhealthy().await {
            tracing::warn!(channel = name, "Channel unhealthy after start: {}", e);
        }
        Ok(Box::pin(futures::stream::select_all(streams)))
    }

    /// Channels whose health check currently fails.
    pub async fn unhealthy(&self) -> Vec<(&str, ChannelError)> {
        let mut failing = Vec::new();
        for channel in &self.channels {
            if let Err(e) = channel.health_check().await {
                failing.push((channel.name(), e));
            }
        }
        failing
    }

    /// Route a reply to the channel the message came from.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .iter()
            .find(|c| c.name() == msg.channel)
            .ok_or_else(|| ChannelError::SendFailed {
                name: msg.channel.clone(),
                reason: "channel not registered".to_string(),
            })?;
        channel.respond(msg, response).await
    }

    /// Shut every channel down, logging failures and returning the first.
    pub async fn shutdown_all(&self) -> Result<(), ChannelError> {
        let mut first_err = None;
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), "Shutdown failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::StreamExt;
    use tokio_stream::wrappers::ReceiverStream;

    use super::*;

    struct FixedChannel {
        name: &'static str,
        lines: Vec<&'static str>,
        replies: Mutex<Vec<String>>,
    }

    impl FixedChannel {
        fn new(name: &'static str, lines: Vec<&'static str>) -> Self {
            Self {
                name,
                lines,
                replies: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Channel for FixedChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let (tx, rx) = tokio::sync::mpsc::channel(8);
            for line in &self.lines {
                let _ = tx.send(IncomingMessage::new(self.name, "u", *line)).await;
            }
            Ok(Box::pin(ReceiverStream::new(rx)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.replies.lock().unwrap().push(response.content);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_start_all_merges_streams() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(FixedChannel::new("a", vec!["1", "2"])));
        manager.add(Box::new(FixedChannel::new("b", vec!["3"])));

        let mut contents: Vec<String> = manager
            .start_all()
            .await
            .unwrap()
            .map(|m| format!("{}:{}", m.channel, m.content))
            .collect()
            .await;
        contents.sort();

        assert_eq!(contents, vec!["a:1", "a:2", "b:3"]);
    }

    struct DownChannel;

    #[async_trait]
    impl Channel for DownChannel {
        fn name(&self) -> &str {
            "down"
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            _response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Err(ChannelError::HealthCheckFailed {
                name: "down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_unhealthy_lists_failing_channels() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(FixedChannel::new("a", vec![])));
        manager.add(Box::new(DownChannel));

        let failing = manager.unhealthy().await;
        assert_eq!(failing.len(), 1);
        assert_eq!(failing[0].0, "down");
        assert!(matches!(failing[0].1, ChannelError::HealthCheckFailed { .. }));

        // An unhealthy channel does not block startup.
        assert!(manager.start_all().await.is_ok());
    }

    #[tokio::test]
    async fn test_respond_to_unknown_channel_fails() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(FixedChannel::new("a", vec![])));

        let msg = IncomingMessage::new("zzz", "u", "hi");
        let err = manager
            .respond(&msg, OutgoingResponse::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::SendFailed { .. }));
    }

    #[test]
    fn test_names_in_registration_order() {
        let mut manager = ChannelManager::new();
        assert!(manager.is_empty());
        manager.add(Box::new(FixedChannel::new("repl", vec![])));
        manager.add(Box::new(FixedChannel::new("http", vec![])));
        assert_eq!(manager.names(), vec!["repl", "http"]);
    }
}
