//! Channel trait: the contract every transport implements.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::types::{IncomingEvent, Keyboard, Payload, UserId};

/// Stream of inbound events produced by a running channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingEvent> + Send>>;

/// A transport the bot listens on and delivers through.
///
/// Channels own their platform I/O end to end; the engine only ever
/// sees `IncomingEvent`s and hands back `OutgoingMessage`s. Delivery is
/// addressed by the metadata the channel attached to the recipient's
/// last inbound event, so each channel can find its own way back
/// (a Telegram chat id, a CLI speaker name, whatever it needs).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short channel identifier ("telegram", "cli").
    fn name(&self) -> &str;

    /// Start listening and return the stream of inbound events.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a payload to a user previously seen on this channel.
    async fn deliver(
        &self,
        recipient: UserId,
        metadata: &serde_json::Value,
        payload: &Payload,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ChannelError>;

    /// Verify the transport is reachable.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}
