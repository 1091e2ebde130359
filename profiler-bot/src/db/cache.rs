//! In-memory cache in front of the profiles table.
//!
//! Profiles are read on every render but written rarely, so lookups are
//! served from a moka cache and every write invalidates the touched key.

use std::time::Duration;

use moka::sync::Cache;
use profiler_types::{Profile, ProfileKey};

/// Profiles idle longer than this fall back to SQLite
const PROFILE_TTI: Duration = Duration::from_secs(1800); // 30 min
const MAX_PROFILES: u64 = 10_000;

pub struct ProfileCache {
    profiles: Cache<ProfileKey, Profile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self {
            profiles: Cache::builder()
                .time_to_idle(PROFILE_TTI)
                .max_capacity(MAX_PROFILES)
                .build(),
        }
    }

    pub fn get(&self, key: &ProfileKey) -> Option<Profile> {
        self.profiles.get(key)
    }

    pub fn insert(&self, profile: Profile) {
        self.profiles.insert(profile.key, profile);
    }

    pub fn invalidate(&self, key: &ProfileKey) {
        self.profiles.invalidate(key);
    }
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}
