//! Channel manager: merges inbound streams and routes outbound
//! messages to whichever channel last saw the recipient.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ChannelError;
use crate::types::{IncomingEvent, OutgoingMessage, UserId};

use super::channel::{Channel, MessageStream};

/// Where a user was last seen: channel name plus whatever metadata the
/// channel needs to reach them again.
#[derive(Debug, Clone)]
struct Route {
    channel: String,
    metadata: serde_json::Value,
}

/// Holds the running channels and the per-user route table.
pub struct ChannelManager {
    channels: Vec<Arc<dyn Channel>>,
    routes: RwLock<HashMap<UserId, Route>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a channel. Call before `start_all`.
    pub fn add(&mut self, channel: Arc<dyn Channel>) {
        tracing::info!(channel = channel.name(), "channel registered");
        self.channels.push(channel);
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Start every registered channel and merge their event streams.
    ///
    /// A channel that fails its health check or startup is skipped with
    /// a warning; the others keep running.
    pub async fn start_all(&self) -> MessageStream {
        let mut streams = Vec::new();

        for channel in &self.channels {
            if let Err(e) = channel.health_check().await {
                tracing::warn!(
                    channel = channel.name(),
                    error = %e,
                    "health check failed; skipping channel"
                );
                continue;
            }

            match channel.start().await {
                Ok(stream) => {
                    tracing::info!(channel = channel.name(), "channel started");
                    streams.push(stream);
                }
                Err(e) => {
                    tracing::warn!(channel = channel.name(), error = %e, "channel failed to start");
                }
            }
        }

        Box::pin(futures::stream::select_all(streams))
    }

    /// Record where this user can be reached, from an inbound event.
    /// Every inbound event refreshes the route, so a user who switches
    /// channels gets replies on the one they spoke on last.
    pub async fn note_route(&self, event: &IncomingEvent) {
        let mut routes = self.routes.write().await;
        routes.insert(
            event.user_id,
            Route {
                channel: event.channel.clone(),
                metadata: event.metadata.clone(),
            },
        );
    }

    /// Deliver one outbound message along the recipient's last route.
    pub async fn deliver(&self, message: &OutgoingMessage) -> Result<(), ChannelError> {
        let route = self
            .routes
            .read()
            .await
            .get(&message.recipient)
            .cloned()
            .ok_or(ChannelError::NoRoute(message.recipient))?;

        let channel = self
            .channels
            .iter()
            .find(|c| c.name() == route.channel)
            .ok_or(ChannelError::NoRoute(message.recipient))?;

        channel
            .deliver(
                message.recipient,
                &route.metadata,
                &message.payload,
                message.keyboard,
            )
            .await
    }

    /// Shut down every channel.
    pub async fn shutdown_all(&self) {
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), error = %e, "shutdown failed");
            }
        }
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
