//! Telegram channel — long-polls the Bot API for updates.
//!
//! Native Bot API implementation over reqwest. Media payloads travel
//! as Telegram `file_id` handles, so relaying a photo or a voice note
//! never downloads the bytes.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::{Channel, MessageStream};
use crate::error::ChannelError;
use crate::profile::Gender;
use crate::types::{IncomingEvent, Keyboard, MediaRef, Payload, UserId, buttons};

/// Connects to the Telegram Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// POST one Bot API call and map failures to `SendFailed`.
    async fn call_api(
        &self,
        method: &str,
        recipient: UserId,
        body: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                recipient,
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                recipient,
                reason: format!("{method} returned {status}: {err}"),
            });
        }

        Ok(())
    }

    /// Send one payload to a chat, picking the Bot API method by kind.
    async fn send_payload(
        &self,
        recipient: UserId,
        chat_id: i64,
        payload: &Payload,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ChannelError> {
        let (method, mut body) = match payload {
            Payload::Text(text) => (
                "sendMessage",
                serde_json::json!({ "chat_id": chat_id, "text": text }),
            ),
            Payload::Photo(media) => ("sendPhoto", media_body(chat_id, "photo", media)),
            Payload::Voice(media) => ("sendVoice", media_body(chat_id, "voice", media)),
            // Stickers carry no caption on Telegram.
            Payload::Sticker(media) => (
                "sendSticker",
                serde_json::json!({ "chat_id": chat_id, "sticker": media.file_id }),
            ),
        };

        if let Some(kb) = keyboard {
            body["reply_markup"] = reply_markup(kb);
        }

        self.call_api(method, recipient, &body).await
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        // Advance offset past this update, parseable or not
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some(event) = parse_update(update) else {
                            continue;
                        };

                        if tx.send(event).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn deliver(
        &self,
        recipient: UserId,
        metadata: &serde_json::Value,
        payload: &Payload,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ChannelError> {
        let chat_id = metadata
            .get("chat_id")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                recipient,
                reason: "no chat_id in delivery route".into(),
            })?;

        self.send_payload(recipient, chat_id, payload, keyboard)
            .await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Turn one `getUpdates` entry into an inbound event.
///
/// Returns `None` for anything the bot does not handle: service
/// messages, unsupported media, updates without a sender. The chat id
/// rides along in metadata so `deliver` can address replies later.
fn parse_update(update: &serde_json::Value) -> Option<IncomingEvent> {
    let message = update.get("message")?;

    let from = message.get("from")?;
    let user_id = UserId(from.get("id").and_then(serde_json::Value::as_i64)?);
    let first_name = from.get("first_name").and_then(|n| n.as_str());
    let username = from.get("username").and_then(|u| u.as_str());

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;

    let payload = parse_payload(message)?;

    let mut event = IncomingEvent::new("telegram", user_id, payload)
        .with_metadata(serde_json::json!({ "chat_id": chat_id }));
    if let Some(name) = first_name.or(username) {
        event = event.with_display_name(name);
    }

    Some(event)
}

/// Extract the payload from a Telegram message object.
fn parse_payload(message: &serde_json::Value) -> Option<Payload> {
    let caption = message.get("caption").and_then(|c| c.as_str());

    if let Some(text) = message.get("text").and_then(|t| t.as_str()) {
        return Some(Payload::text(text));
    }

    // Telegram lists photo sizes smallest-first; the last entry is the
    // full-resolution one.
    if let Some(sizes) = message.get("photo").and_then(|p| p.as_array()) {
        let file_id = sizes.last()?.get("file_id")?.as_str()?;
        return Some(Payload::Photo(media_ref(file_id, caption)));
    }

    if let Some(file_id) = message
        .get("voice")
        .and_then(|v| v.get("file_id"))
        .and_then(|f| f.as_str())
    {
        return Some(Payload::Voice(media_ref(file_id, caption)));
    }

    if let Some(file_id) = message
        .get("sticker")
        .and_then(|s| s.get("file_id"))
        .and_then(|f| f.as_str())
    {
        return Some(Payload::Sticker(media_ref(file_id, None)));
    }

    None
}

fn media_ref(file_id: &str, caption: Option<&str>) -> MediaRef {
    let media = MediaRef::new(file_id);
    match caption {
        Some(c) => media.with_caption(c),
        None => media,
    }
}

/// Body for a file_id-addressed media send ("photo", "voice").
fn media_body(chat_id: i64, field: &str, media: &MediaRef) -> serde_json::Value {
    let mut body = serde_json::json!({ "chat_id": chat_id, field: media.file_id });
    if let Some(cap) = &media.caption {
        body["caption"] = serde_json::Value::String(cap.clone());
    }
    body
}

/// Render a keyboard hint as a Bot API `reply_markup` object.
fn reply_markup(keyboard: Keyboard) -> serde_json::Value {
    match keyboard {
        Keyboard::Main => serde_json::json!({
            "keyboard": [
                [{ "text": buttons::FIND }],
                [{ "text": buttons::NEXT }, { "text": buttons::STOP }],
            ],
            "resize_keyboard": true,
        }),
        Keyboard::GenderChoice => serde_json::json!({
            "keyboard": [
                [{ "text": Gender::Male.to_string() }, { "text": Gender::Female.to_string() }],
            ],
            "resize_keyboard": true,
            "one_time_keyboard": true,
        }),
        Keyboard::Remove => serde_json::json!({ "remove_keyboard": true }),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
