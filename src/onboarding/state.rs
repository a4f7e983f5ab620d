//! Onboarding state machine: tracks which profile field is being collected.

use serde::{Deserialize, Serialize};

use crate::profile::{Gender, Profile};
use crate::types::MediaRef;

/// The steps of the onboarding conversation.
///
/// Progresses linearly: Name → Age → Photo → Gender → Bio → Complete.
/// No backward transitions, no skipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Name,
    Age,
    Photo,
    Gender,
    Bio,
    Complete,
}

impl OnboardingStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Name, Age) | (Age, Photo) | (Photo, Gender) | (Gender, Bio) | (Bio, Complete)
        )
    }

    /// Whether this step is terminal (the profile is fully collected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Name => Some(Age),
            Age => Some(Photo),
            Photo => Some(Gender),
            Gender => Some(Bio),
            Bio => Some(Complete),
            Complete => None,
        }
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::Name
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::Photo => "photo",
            Self::Gender => "gender",
            Self::Bio => "bio",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Profile fields collected so far, all optional until their step runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub age: Option<u8>,
    pub photo: Option<MediaRef>,
    pub gender: Option<Gender>,
    pub bio: Option<String>,
}

impl ProfileDraft {
    /// Assemble the final profile. `None` if any field is still missing.
    pub fn into_profile(self) -> Option<Profile> {
        Some(Profile {
            name: self.name?,
            age: self.age?,
            photo: Some(self.photo?),
            gender: Some(self.gender?),
            bio: self.bio?,
            completed_at: Some(chrono::Utc::now()),
        })
    }
}

/// Per-user onboarding progress.
///
/// Exists only while the user is mid-onboarding; committed to the
/// profile store and discarded on completion, dropped outright on
/// abandonment.
#[derive(Debug, Clone, Default)]
pub struct OnboardingProgress {
    pub step: OnboardingStep,
    pub draft: ProfileDraft,
}

impl OnboardingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next step. Returns the new step, or `None` when
    /// already terminal.
    pub fn advance(&mut self) -> Option<OnboardingStep> {
        let next = self.step.next()?;
        self.step = next;
        Some(next)
    }
}
