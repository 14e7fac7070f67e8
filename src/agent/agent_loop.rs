//! Main agent loop.
//!
//! Pulls messages off the merged channel stream and hands each one to the
//! [`CommandRouter`] on its own task, so a slow run never blocks other
//! callers.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse};
use crate::error::Error;

use super::router::CommandRouter;

/// The main agent that coordinates channels and the command router.
pub struct Agent {
    name: String,
    router: Arc<CommandRouter>,
    channels: Arc<ChannelManager>,
}

impl Agent {
    pub fn new(name: impl Into<String>, router: CommandRouter, channels: ChannelManager) -> Self {
        Self {
            name: name.into(),
            router: Arc::new(router),
            channels: Arc::new(channels),
        }
    }

    /// Run until Ctrl+C or until every channel stream has ended.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;
        let mut in_flight = tokio::task::JoinSet::new();

        tracing::info!("Agent {} ready and listening", self.name);

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
                // Reap finished handlers so the set does not grow unbounded.
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
            };

            let router = Arc::clone(&self.router);
            let channels = Arc::clone(&self.channels);
            in_flight.spawn(handle_message(router, channels, message));
        }

        // Let in-flight commands reply before channels close.
        while in_flight.join_next().await.is_some() {}

        tracing::info!("Agent shutting down...");
        self.channels.shutdown_all().await?;

        Ok(())
    }
}

async fn handle_message(
    router: Arc<CommandRouter>,
    channels: Arc<ChannelManager>,
    message: IncomingMessage,
) {
    let Some(reply) = router.handle(&message.user_id, &message.content).await else {
        return;
    };

    if let Err(e) = channels
        .respond(&message, OutgoingResponse::text(reply))
        .await
    {
        tracing::warn!(channel = %message.channel, "Failed to send reply: {}", e);
    }
}
