//! Profile record operations

use profiler_types::{Platform, Profile, ProfileField, ProfileKey, ProfileStats};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

use super::super::Database;

const PROFILE_COLUMNS: &str = "profile_key, guild_id, user_id, description, steamurl,
    xbox, psn, steam, uplay, gog, switch, bnet, origin, epic, rocketid,
    created_at, updated_at";

/// Column index of the first platform handle in PROFILE_COLUMNS
const FIRST_HANDLE_COLUMN: usize = 5;

/// Initialize the profiles table
pub fn init_tables(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            profile_key TEXT PRIMARY KEY,
            guild_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            description TEXT,
            steamurl TEXT,
            xbox TEXT,
            psn TEXT,
            steam TEXT,
            uplay TEXT,
            gog TEXT,
            switch TEXT,
            bnet TEXT,
            origin TEXT,
            epic TEXT,
            rocketid TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_profiles_guild ON profiles(guild_id)",
        [],
    )?;

    log::info!("Store: Initialized profiles table");
    Ok(())
}

impl Database {
    /// Create a blank profile if none exists. Returns true when a row was created.
    pub fn ensure_profile(&self, key: &ProfileKey) -> Result<bool, String> {
        let conn = self.conn();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO profiles (profile_key, guild_id, user_id) VALUES (?1, ?2, ?3)",
                params![key.to_string(), key.guild_id.to_string(), key.user_id.to_string()],
            )
            .map_err(|e| format!("Failed to ensure profile {}: {}", key, e))?;

        if inserted > 0 {
            log::debug!("Store: Created blank profile {}", key);
        }
        Ok(inserted > 0)
    }

    /// Set one field, creating the profile if needed. The value is trimmed;
    /// an empty result is stored as an empty string.
    pub fn set_profile_field(
        &self,
        key: &ProfileKey,
        field: ProfileField,
        value: &str,
    ) -> Result<(), String> {
        let value = value.trim();
        // Column names come from the closed ProfileField set, never from user input
        let column = field.name();
        let sql = format!(
            "INSERT INTO profiles (profile_key, guild_id, user_id, {col}) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(profile_key) DO UPDATE SET
                {col} = excluded.{col},
                updated_at = datetime('now')",
            col = column
        );

        let conn = self.conn();
        conn.execute(
            &sql,
            params![
                key.to_string(),
                key.guild_id.to_string(),
                key.user_id.to_string(),
                value
            ],
        )
        .map_err(|e| format!("Failed to set {} for {}: {}", column, key, e))?;
        // Invalidate before releasing the lock so no reader can refill the old row
        self.cache.invalidate(key);
        drop(conn);

        log::debug!("Store: Set {} for {} to '{}'", column, key, value);
        Ok(())
    }

    /// Get a profile by key. Returns Ok(None) when it does not exist.
    pub fn get_profile(&self, key: &ProfileKey) -> Result<Option<Profile>, String> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(Some(cached));
        }

        let conn = self.conn();
        let profile = conn
            .query_row(
                &format!("SELECT {} FROM profiles WHERE profile_key = ?1", PROFILE_COLUMNS),
                params![key.to_string()],
                row_to_profile,
            )
            .optional()
            .map_err(|e| format!("Database error: {}", e))?;

        // Filled under the lock; writers invalidate under the same lock
        if let Some(p) = &profile {
            self.cache.insert(p.clone());
        }
        drop(conn);
        Ok(profile)
    }

    /// All profiles in a guild with `field` present, in insertion order
    pub fn filter_profiles(&self, guild_id: u64, field: ProfileField) -> Result<Vec<Profile>, String> {
        let column = field.name();
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {cols} FROM profiles
                 WHERE guild_id = ?1 AND {col} IS NOT NULL AND {col} != ''
                 ORDER BY rowid",
                cols = PROFILE_COLUMNS,
                col = column
            ))
            .map_err(|e| format!("Failed to prepare query: {}", e))?;

        let profiles = stmt
            .query_map(params![guild_id.to_string()], row_to_profile)
            .map_err(|e| format!("Failed to query profiles: {}", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to collect profiles: {}", e))?;

        Ok(profiles)
    }

    pub fn get_profile_stats(&self) -> Result<ProfileStats, String> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT guild_id) FROM profiles",
            [],
            |row| {
                Ok(ProfileStats {
                    total_profiles: row.get(0)?,
                    guild_count: row.get(1)?,
                })
            },
        )
        .map_err(|e| format!("Failed to count profiles: {}", e))
    }
}

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    let raw_key: String = row.get(0)?;
    let key: ProfileKey = raw_key.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
    })?;

    let mut handles = BTreeMap::new();
    for (offset, platform) in Platform::all().enumerate() {
        let value: Option<String> = row.get(FIRST_HANDLE_COLUMN + offset)?;
        if let Some(v) = value {
            handles.insert(platform, v);
        }
    }

    Ok(Profile {
        key,
        description: row.get(3)?,
        steam_url: row.get(4)?,
        handles,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}
