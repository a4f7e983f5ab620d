//! Applies one user input to the onboarding state machine.
//!
//! Validation failures are recoverable: the step never advances, the
//! draft keeps what it already had, and the caller re-prompts. There is
//! no retry limit and no way back to an earlier step.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::profile::{Gender, Profile};
use crate::types::{Keyboard, Payload};

use super::prompts;
use super::state::{OnboardingProgress, OnboardingStep};

const MAX_NAME_CHARS: usize = 20;
const MAX_BIO_CHARS: usize = 200;

/// Letters only, single spaces between words.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Alphabetic}+(?: \p{Alphabetic}+)*$").unwrap());

/// Letters, digits, whitespace, light punctuation, emoji.
static BIO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{M}\p{N}\p{Extended_Pictographic}\u{200D}\u{FE0F}\s.,!?'\-():;]+$")
        .unwrap()
});

/// What applying one input to the state machine produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Input accepted; send the next step's prompt.
    Advanced {
        prompt: &'static str,
        keyboard: Option<Keyboard>,
    },
    /// Input rejected; state unchanged; re-prompt with the reason.
    Rejected(ValidationError),
    /// Input dropped without a reply (non-image at the photo step).
    Ignored,
    /// Final field accepted; the assembled profile is ready to commit.
    Completed(Profile),
}

/// Apply one payload to the user's onboarding progress.
pub fn apply_input(progress: &mut OnboardingProgress, payload: &Payload) -> StepOutcome {
    match progress.step {
        OnboardingStep::Name => {
            let Some(text) = payload.as_text() else {
                return StepOutcome::Rejected(ValidationError::ExpectedText);
            };
            match validate_name(text) {
                Ok(name) => {
                    progress.draft.name = Some(name);
                    advance(progress)
                }
                Err(err) => StepOutcome::Rejected(err),
            }
        }
        OnboardingStep::Age => {
            let Some(text) = payload.as_text() else {
                return StepOutcome::Rejected(ValidationError::ExpectedText);
            };
            match validate_age(text) {
                Ok(age) => {
                    progress.draft.age = Some(age);
                    advance(progress)
                }
                Err(err) => StepOutcome::Rejected(err),
            }
        }
        OnboardingStep::Photo => match payload {
            Payload::Photo(media) => {
                progress.draft.photo = Some(media.clone());
                advance(progress)
            }
            _ => StepOutcome::Ignored,
        },
        OnboardingStep::Gender => {
            let Some(text) = payload.as_text() else {
                return StepOutcome::Rejected(ValidationError::ExpectedText);
            };
            match validate_gender(text) {
                Ok(gender) => {
                    progress.draft.gender = Some(gender);
                    advance(progress)
                }
                Err(err) => StepOutcome::Rejected(err),
            }
        }
        OnboardingStep::Bio => {
            let Some(text) = payload.as_text() else {
                return StepOutcome::Rejected(ValidationError::ExpectedText);
            };
            match validate_bio(text) {
                Ok(bio) => {
                    progress.draft.bio = Some(bio);
                    let draft = std::mem::take(&mut progress.draft);
                    match draft.into_profile() {
                        Some(profile) => {
                            progress.step = OnboardingStep::Complete;
                            StepOutcome::Completed(profile)
                        }
                        // A hole in the draft means a step was skipped;
                        // start over rather than commit a partial profile.
                        None => {
                            *progress = OnboardingProgress::new();
                            StepOutcome::Advanced {
                                prompt: prompts::for_step(OnboardingStep::Name),
                                keyboard: prompts::keyboard_for_step(OnboardingStep::Name),
                            }
                        }
                    }
                }
                Err(err) => StepOutcome::Rejected(err),
            }
        }
        OnboardingStep::Complete => StepOutcome::Ignored,
    }
}

/// Move to the next step and bundle its prompt.
fn advance(progress: &mut OnboardingProgress) -> StepOutcome {
    // Callers only advance from non-terminal steps.
    let Some(next) = progress.advance() else {
        return StepOutcome::Ignored;
    };
    StepOutcome::Advanced {
        prompt: prompts::for_step(next),
        keyboard: prompts::keyboard_for_step(next),
    }
}

pub(crate) fn validate_name(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS || !NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidName);
    }
    Ok(name.to_string())
}

pub(crate) fn validate_age(input: &str) -> Result<u8, ValidationError> {
    let age: u8 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAge)?;
    if !(1..=99).contains(&age) {
        return Err(ValidationError::InvalidAge);
    }
    Ok(age)
}

pub(crate) fn validate_gender(input: &str) -> Result<Gender, ValidationError> {
    Gender::from_label(input).ok_or(ValidationError::InvalidGender)
}

pub(crate) fn validate_bio(input: &str) -> Result<String, ValidationError> {
    let bio = input.trim();
    if bio.is_empty() || bio.chars().count() > MAX_BIO_CHARS || !BIO_RE.is_match(bio) {
        return Err(ValidationError::InvalidBio);
    }
    Ok(bio.to_string())
}
