//! CLI channel — stdin/stdout REPL for local testing.
//!
//! Pairing needs at least two users, so every input line can carry a
//! speaker tag: `alice: hello` speaks as alice, an untagged line speaks
//! as `you`. Media stand-ins `@photo [caption]`, `@voice` and
//! `@sticker` let the whole onboarding and relay path run offline.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, MessageStream};
use crate::error::ChannelError;
use crate::types::{IncomingEvent, Keyboard, MediaRef, Payload, UserId, buttons};

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Speakers get synthetic negative IDs, stable per name
            // within a run.
            let mut speakers: HashMap<String, UserId> = HashMap::new();
            let mut serial: u64 = 0;

            eprintln!("CLI channel ready. Speak as anyone with \"name: text\".");
            eprintln!("Media stand-ins: @photo [caption], @voice, @sticker.");
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }

                        let (speaker, body) = split_speaker(&line);
                        let next_id = UserId(-(speakers.len() as i64) - 1);
                        let user_id = *speakers.entry(speaker.to_string()).or_insert(next_id);

                        serial += 1;
                        let event = IncomingEvent::new("cli", user_id, parse_body(body, serial))
                            .with_metadata(serde_json::json!({ "speaker": speaker }))
                            .with_display_name(speaker);

                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
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
        let fallback = recipient.to_string();
        let speaker = metadata
            .get("speaker")
            .and_then(|s| s.as_str())
            .unwrap_or(&fallback);

        match payload {
            Payload::Text(text) => println!("\n[to {speaker}] {text}"),
            Payload::Photo(m) | Payload::Voice(m) | Payload::Sticker(m) => {
                let caption = m.caption.as_deref().unwrap_or_default();
                println!("\n[to {speaker}] [{} {}] {caption}", payload.kind(), m.file_id);
            }
        }
        if let Some(hint) = keyboard_hint(keyboard) {
            println!("{hint}");
        }
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split an input line into its speaker tag and body.
fn split_speaker(line: &str) -> (&str, &str) {
    if let Some((tag, rest)) = line.split_once(':') {
        let tag = tag.trim();
        if !tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return (tag, rest.trim());
        }
    }
    ("you", line.trim())
}

/// Turn a line body into a payload, expanding media stand-ins.
fn parse_body(body: &str, serial: u64) -> Payload {
    if let Some(caption) = media_arg(body, "@photo") {
        let media = MediaRef::new(format!("cli-photo-{serial}"));
        return Payload::Photo(match caption {
            "" => media,
            c => media.with_caption(c),
        });
    }
    if let Some(caption) = media_arg(body, "@voice") {
        let media = MediaRef::new(format!("cli-voice-{serial}"));
        return Payload::Voice(match caption {
            "" => media,
            c => media.with_caption(c),
        });
    }
    if media_arg(body, "@sticker").is_some() {
        return Payload::Sticker(MediaRef::new(format!("cli-sticker-{serial}")));
    }
    Payload::text(body)
}

/// The argument after a media stand-in tag, or `None` if the body does
/// not start with that tag as a whole word.
fn media_arg<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let rest = body.strip_prefix(tag)?;
    if rest.is_empty() {
        Some("")
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// One-line rendering of a keyboard hint, or `None` to stay quiet.
fn keyboard_hint(keyboard: Option<Keyboard>) -> Option<String> {
    match keyboard? {
        Keyboard::Main => Some(format!(
            "(buttons: {} | {} | {})",
            buttons::FIND,
            buttons::NEXT,
            buttons::STOP
        )),
        Keyboard::GenderChoice => Some("(buttons: Male | Female)".to_string()),
        Keyboard::Remove => None,
    }
}

// ── Tests ───────────────────────────────────────────────────────────
