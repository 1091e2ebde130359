//! SQLite connection wrapper shared by the table modules.

use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::cache::ProfileCache;

pub struct Database {
    conn: Mutex<Connection>,
    pub(crate) cache: ProfileCache,
}

impl Database {
    /// Open (or create) the database at `path`. `:memory:` opens a private in-memory db.
    pub fn new(path: &str) -> SqliteResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        log::warn!("Store: Could not create {}: {}", parent.display(), e);
                    }
                }
            }
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
            cache: ProfileCache::new(),
        };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> SqliteResult<()> {
        let conn = self.conn();
        super::tables::profiles::init_tables(&conn)
    }

    /// Lock the connection. A poisoned lock is recovered since SQLite
    /// keeps its own consistency.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
