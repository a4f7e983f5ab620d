//! Profile data model assembled by onboarding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MediaRef;

/// One of the two fixed gender labels offered on the choice keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Parses a keyboard label back into a variant. Case-insensitive,
    /// surrounding whitespace ignored.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
        }
    }
}

/// A user profile. Overwritten wholesale when onboarding re-runs,
/// never deleted while the process lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub age: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// The placeholder resolved for users who never finished onboarding.
    pub fn anonymous() -> Self {
        Self {
            name: "Anonymous".to_string(),
            age: 0,
            photo: None,
            gender: None,
            bio: String::new(),
            completed_at: None,
        }
    }

    /// True once every onboarding field has been collected.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty()
            && (1..=99).contains(&self.age)
            && self.photo.is_some()
            && self.gender.is_some()
            && !self.bio.is_empty()
    }

    /// Short `name (gender, age)` fragment used in pairing notices.
    /// Missing fields degrade gracefully rather than rendering zeros.
    pub fn summary(&self) -> String {
        match (self.gender, self.age) {
            (Some(gender), 1..=99) => format!("{} ({}, {})", self.name, gender, self.age),
            (Some(gender), _) => format!("{} ({})", self.name, gender),
            (None, 1..=99) => format!("{} ({})", self.name, self.age),
            (None, _) => self.name.clone(),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::anonymous()
    }
}
