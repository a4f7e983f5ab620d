//! Command parsing for inbound text.
//!
//! Only text that is *not* mid-onboarding input reaches this parser;
//! onboarding answers are never interpreted as commands.

use crate::types::buttons;

/// Parses message text into a Command.
pub struct CommandParser;

impl CommandParser {
    /// Parse message text into a Command.
    ///
    /// Slash commands match case-insensitively. Keyboard button labels
    /// match exactly as rendered. Anything else is relay content.
    pub fn parse(text: &str) -> Command {
        let trimmed = text.trim();

        // Button labels carry emoji; match them before lowercasing
        match trimmed {
            buttons::FIND => return Command::Find,
            buttons::NEXT => return Command::Next,
            buttons::STOP => return Command::Stop,
            _ => {}
        }

        let lower = trimmed.to_lowercase();
        match lower.as_str() {
            "/start" => Command::Start,
            "/find" => Command::Find,
            "/next" => Command::Next,
            "/stop" => Command::Stop,
            "/help" | "/?" => Command::Help,

            // Parameterized profile edits, then fallback
            _ => parse_edit(trimmed, &lower),
        }
    }
}

/// `/name <new name>` and `/gender <label>`: profile edits.
fn parse_edit(trimmed: &str, lower: &str) -> Command {
    parse_set_name(trimmed, lower)
        .or_else(|| parse_set_gender(trimmed, lower))
        .unwrap_or(Command::Content)
}

/// `/name <new name>`: change the stored name.
fn parse_set_name(trimmed: &str, lower: &str) -> Option<Command> {
    let word = lower.split_whitespace().next()?;
    if word != "/name" && word != "/setname" {
        return None;
    }
    let arg: Vec<&str> = trimmed.split_whitespace().skip(1).collect();
    Some(Command::SetName(arg.join(" ")))
}

/// `/gender <label>`: change the stored gender.
fn parse_set_gender(trimmed: &str, lower: &str) -> Option<Command> {
    let word = lower.split_whitespace().next()?;
    if word != "/gender" {
        return None;
    }
    let arg: Vec<&str> = trimmed.split_whitespace().skip(1).collect();
    Some(Command::SetGender(arg.join(" ")))
}

/// A recognized inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`: begin interaction; onboarding entry per policy.
    Start,
    /// `/find` or the find button: request a partner.
    Find,
    /// `/next` or the next button: swap partners.
    Next,
    /// `/stop` or the stop button: leave the chat or the queue.
    Stop,
    /// `/help`: command summary.
    Help,
    /// `/name <new name>`: update the stored name.
    SetName(String),
    /// `/gender <label>`: update the stored gender.
    SetGender(String),
    /// Not a command; relay content.
    Content,
}
