//! Core identifiers, payloads, and event types shared across the crate.

use serde::{Deserialize, Serialize};

/// Platform-assigned user identifier.
///
/// Telegram hands out signed 64-bit IDs. The CLI channel allocates
/// negative synthetic IDs, so simulated users can never collide with
/// real ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to a media object held by the chat platform.
///
/// Relaying media between paired users forwards the handle untouched;
/// the engine never downloads content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Platform-native file identifier (e.g. a Telegram `file_id`).
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl MediaRef {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// A message payload, inbound or outbound.
///
/// The relay path clones one of these from sender to partner without
/// looking inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Photo(MediaRef),
    Voice(MediaRef),
    Sticker(MediaRef),
}

impl Payload {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Payload kind for logging. Content itself is never logged.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Photo(_) => "photo",
            Self::Voice(_) => "voice",
            Self::Sticker(_) => "sticker",
        }
    }

    /// Whether this payload satisfies the onboarding photo step.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Photo(_))
    }

    /// The text content, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// An inbound event from a transport channel.
#[derive(Debug, Clone)]
pub struct IncomingEvent {
    pub user_id: UserId,
    /// Name of the channel the event arrived on ("telegram", "cli").
    pub channel: String,
    /// Display name reported by the platform, if any.
    pub display_name: Option<String>,
    pub payload: Payload,
    /// Channel-private addressing data (e.g. Telegram chat_id), echoed
    /// back verbatim at delivery time.
    pub metadata: serde_json::Value,
}

impl IncomingEvent {
    pub fn new(channel: &str, user_id: UserId, payload: Payload) -> Self {
        Self {
            user_id,
            channel: channel.to_string(),
            display_name: None,
            payload,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Reply-keyboard hints. Transports may render them or ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// The resting menu: find / next / stop.
    Main,
    /// The two gender labels, shown once during onboarding.
    GenderChoice,
    /// Remove any visible custom keyboard.
    Remove,
}

/// Button labels shared between the main keyboard and the command parser.
pub mod buttons {
    pub const FIND: &str = "Find a partner 🔍";
    pub const NEXT: &str = "Next 🔁";
    pub const STOP: &str = "Stop ❌";
}

/// An outbound message produced by the engine, addressed by user.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub recipient: UserId,
    pub payload: Payload,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn text(recipient: UserId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            payload: Payload::text(text),
            keyboard: None,
        }
    }

    pub fn payload(recipient: UserId, payload: Payload) -> Self {
        Self {
            recipient,
            payload,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Attach a keyboard hint only when one is given.
    pub fn maybe_keyboard(mut self, keyboard: Option<Keyboard>) -> Self {
        self.keyboard = keyboard;
        self
    }
}
