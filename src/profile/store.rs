//! In-memory profile store.

use std::collections::HashMap;

use crate::types::UserId;

use super::model::Profile;

/// Process-lifetime map of user id to profile.
///
/// Reads never fail: unknown users resolve to the anonymous default so
/// relay and pairing notices always have something to render.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: HashMap<UserId, Profile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a profile, replacing any previous one wholesale.
    pub fn set(&mut self, id: UserId, profile: Profile) {
        self.profiles.insert(id, profile);
    }

    /// The stored profile, or the anonymous default for unknown users.
    pub fn get(&self, id: UserId) -> Profile {
        self.profiles
            .get(&id)
            .cloned()
            .unwrap_or_else(Profile::anonymous)
    }

    /// Whether this user has a fully collected profile.
    pub fn is_complete(&self, id: UserId) -> bool {
        self.profiles.get(&id).is_some_and(Profile::is_complete)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Gender;
    use crate::types::MediaRef;

    #[test]
    fn test_get_unknown_user_returns_anonymous() {
        let store = ProfileStore::new();
        let profile = store.get(UserId(42));
        assert_eq!(profile.name, "Anonymous");
        assert!(!store.is_complete(UserId(42)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_overwrites_wholesale() {
        let mut store = ProfileStore::new();
        let id = UserId(1);

        let first = Profile {
            name: "Bob".to_string(),
            age: 30,
            photo: Some(MediaRef::new("p1")),
            gender: Some(Gender::Male),
            bio: "First bio".to_string(),
            completed_at: None,
        };
        store.set(id, first);
        assert!(store.is_complete(id));

        let second = Profile {
            name: "Bobby".to_string(),
            ..Profile::anonymous()
        };
        store.set(id, second);

        assert_eq!(store.get(id).name, "Bobby");
        assert_eq!(store.get(id).bio, "");
        assert!(!store.is_complete(id));
        assert_eq!(store.len(), 1);
    }
}
