//! Async profile store with a load-complete signal.
//!
//! The database is opened on a blocking task at startup. Every operation
//! first awaits `ready()`, so commands arriving while the store is still
//! loading simply wait instead of failing.

use profiler_types::{Platform, Profile, ProfileField, ProfileKey, ProfileStats};
use std::sync::Arc;
use tokio::sync::watch;

use crate::db::Database;

#[derive(Clone)]
enum LoadState {
    Loading,
    Ready(Arc<Database>),
    Failed(String),
}

#[derive(Clone)]
pub struct ProfileStore {
    state: watch::Receiver<LoadState>,
}

impl ProfileStore {
    /// Start loading the database at `path` in the background
    pub fn open(path: &str) -> Self {
        let (tx, rx) = watch::channel(LoadState::Loading);
        let path = path.to_string();

        tokio::spawn(async move {
            let loaded = tokio::task::spawn_blocking(move || Database::new(&path)).await;
            let state = match loaded {
                Ok(Ok(db)) => {
                    match db.get_profile_stats() {
                        Ok(stats) => log::info!(
                            "Store: {} profiles loaded across {} guilds",
                            stats.total_profiles,
                            stats.guild_count
                        ),
                        Err(e) => log::warn!("Store: Loaded but could not count profiles: {}", e),
                    }
                    LoadState::Ready(Arc::new(db))
                }
                Ok(Err(e)) => {
                    log::error!("Store: Failed to open database: {}", e);
                    LoadState::Failed(format!("Failed to open database: {}", e))
                }
                Err(e) => {
                    log::error!("Store: Database loader panicked: {}", e);
                    LoadState::Failed(format!("Database loader failed: {}", e))
                }
            };
            let _ = tx.send(state);
        });

        Self { state: rx }
    }

    /// Wrap an already open database; ready immediately
    pub fn from_database(db: Arc<Database>) -> Self {
        let (_tx, rx) = watch::channel(LoadState::Ready(db));
        Self { state: rx }
    }

    /// Wait until the store has finished loading
    pub async fn ready(&self) -> Result<Arc<Database>, String> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| !matches!(s, LoadState::Loading))
            .await
            .map_err(|_| "Store loader stopped before finishing".to_string())?
            .clone();

        match state {
            LoadState::Ready(db) => Ok(db),
            LoadState::Failed(e) => Err(e),
            LoadState::Loading => Err("Store is still loading".to_string()),
        }
    }

    /// Create a blank profile for `key` if absent. Returns true when created.
    pub async fn ensure(&self, key: &ProfileKey) -> Result<bool, String> {
        self.ready().await?.ensure_profile(key)
    }

    pub async fn set_field(
        &self,
        key: &ProfileKey,
        field: ProfileField,
        value: &str,
    ) -> Result<(), String> {
        self.ready().await?.set_profile_field(key, field, value)
    }

    /// Fetch a profile; a missing record is an error carrying the key
    pub async fn get(&self, key: &ProfileKey) -> Result<Profile, String> {
        self.ready()
            .await?
            .get_profile(key)?
            .ok_or_else(|| format!("Profile not found: {}", key))
    }

    /// Whether `field` is present and non-empty on the profile
    pub async fn has(&self, key: &ProfileKey, field: ProfileField) -> Result<bool, String> {
        Ok(self
            .ready()
            .await?
            .get_profile(key)?
            .is_some_and(|p| p.has(field)))
    }

    /// Profiles in `guild_id` with `platform` set, in insertion order
    pub async fn filter(&self, guild_id: u64, platform: Platform) -> Result<Vec<Profile>, String> {
        self.ready()
            .await?
            .filter_profiles(guild_id, ProfileField::Handle(platform))
    }

    pub async fn stats(&self) -> Result<ProfileStats, String> {
        self.ready().await?.get_profile_stats()
    }
}
