//! Sequential profile onboarding.
//!
//! Collects the five profile fields one question at a time and gates
//! matchmaking until all of them are in. Transport-free: the engine
//! feeds payloads in and turns the outcomes into replies.

pub mod flow;
pub mod prompts;
pub mod state;

pub use flow::{StepOutcome, apply_input};
pub use state::{OnboardingProgress, OnboardingStep, ProfileDraft};
