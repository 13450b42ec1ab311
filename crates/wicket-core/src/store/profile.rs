//! Best-effort cache of the last known user profile.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::profile::{CachedProfile, Profile};
use crate::traits::Storage;

/// Storage key for the cached profile snapshot.
pub const PROFILE_KEY: &str = "profile";

#[derive(Debug, Clone)]
pub struct ProfileCache {
    storage: Arc<dyn Storage>,
}

impl ProfileCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Load the cached snapshot. A corrupt entry is discarded.
    pub fn load(&self) -> Option<CachedProfile> {
        let raw = match self.storage.get(PROFILE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read cached profile");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cached profile");
                self.clear();
                None
            }
        }
    }

    /// Replace the cached snapshot.
    pub fn save(&self, profile: &Profile) -> CachedProfile {
        let cached = CachedProfile::new(profile.clone());
        match serde_json::to_string(&cached) {
            Ok(json) => {
                if let Err(e) = self.storage.set(PROFILE_KEY, &json) {
                    warn!(error = %e, "Failed to persist cached profile");
                } else {
                    debug!(user_id = profile.id, "Profile cached");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize profile"),
        }
        cached
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(PROFILE_KEY) {
            warn!(error = %e, "Failed to remove cached profile");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use serde_json::json;

    fn profile() -> Profile {
        serde_json::from_value(json!({"id": 1, "first_name": "A"})).unwrap()
    }

    #[test]
    fn save_then_load() {
        let cache = ProfileCache::new(Arc::new(MemoryStorage::new()));
        assert!(cache.load().is_none());

        cache.save(&profile());
        let cached = cache.load().unwrap();
        assert_eq!(cached.profile, profile());
    }

    #[test]
    fn corrupt_entry_is_dropped() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(PROFILE_KEY, "{not json").unwrap();
        let cache = ProfileCache::new(storage.clone());

        assert!(cache.load().is_none());
        assert!(storage.get(PROFILE_KEY).unwrap().is_none());
    }

    #[test]
    fn clear_removes_snapshot() {
        let cache = ProfileCache::new(Arc::new(MemoryStorage::new()));
        cache.save(&profile());
        cache.clear();
        assert!(cache.load().is_none());
    }
}
