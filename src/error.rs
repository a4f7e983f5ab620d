//! Error types for pairchat.

use crate::types::UserId;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Matchmaking error: {0}")]
    Match(#[from] MatchError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to deliver to {recipient} on channel {name}: {reason}")]
    SendFailed {
        name: String,
        recipient: UserId,
        reason: String,
    },

    #[error("No known route for user {0}")]
    NoRoute(UserId),

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// Matchmaking and relay errors. All of these are recoverable: the engine
/// turns each into a user-visible reply and leaves state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("user {0} has not completed their profile")]
    IncompleteProfile(UserId),

    #[error("user {0} is already in an active conversation")]
    AlreadyPaired(UserId),

    #[error("user {0} is not in an active conversation")]
    NotPaired(UserId),
}

/// Why an onboarding answer was rejected. Each variant maps to a
/// re-prompt; the step never advances on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("names are 1-20 letters, with single spaces between words")]
    InvalidName,

    #[error("age must be a whole number between 1 and 99")]
    InvalidAge,

    #[error("please pick one of the two options on the keyboard")]
    InvalidGender,

    #[error("bios are up to 200 characters of plain text")]
    InvalidBio,

    #[error("please answer in text")]
    ExpectedText,
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
