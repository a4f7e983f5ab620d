//! Pairchat: anonymous 1:1 chat pairing over pluggable transports.

pub mod channels;
pub mod config;
pub mod engine;
pub mod error;
pub mod matchmaker;
pub mod onboarding;
pub mod ops;
pub mod profile;
pub mod types;
