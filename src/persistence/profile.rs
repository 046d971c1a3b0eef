//! Player profile kept between sessions
//!
//! Only the last used name, for pre-filling the name field. Never consulted
//! for ranking.

use serde::{Deserialize, Serialize};

use super::{Envelope, KeyValueStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub last_name: Option<String>,
}

impl PlayerProfile {
    const STORAGE_KEY: &'static str = "circle_ace_profile";
    const VERSION: u32 = 1;

    pub fn load(store: &dyn KeyValueStore) -> Self {
        let profile: PlayerProfile = Envelope::load(store, Self::STORAGE_KEY, Self::VERSION);
        if let Some(name) = &profile.last_name {
            log::info!("Welcome back, {name}");
        }
        profile
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        if Envelope::save(store, Self::STORAGE_KEY, Self::VERSION, self) {
            log::debug!("Player profile saved");
        }
    }

    /// Remember `name`; returns true if it changed
    pub fn remember(&mut self, name: &str) -> bool {
        if self.last_name.as_deref() == Some(name) {
            return false;
        }
        self.last_name = Some(name.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_profile_roundtrip() {
        let mut store = MemoryStore::new();
        let mut profile = PlayerProfile::load(&store);
        assert_eq!(profile.last_name, None);

        assert!(profile.remember("RoundRobin"));
        assert!(!profile.remember("RoundRobin"));
        profile.save(&mut store);

        assert_eq!(
            PlayerProfile::load(&store).last_name.as_deref(),
            Some("RoundRobin")
        );
    }

    #[test]
    fn test_corrupt_profile_is_empty() {
        let mut store = MemoryStore::new();
        store.set("circle_ace_profile", "\u{0}garbage").unwrap();
        assert_eq!(PlayerProfile::load(&store), PlayerProfile::default());
    }
}
