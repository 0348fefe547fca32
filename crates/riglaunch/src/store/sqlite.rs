//! SQLite-backed key-value tiers.
//!
//! All tiers opened from the same handle share one connection; access is
//! serialized through a `Mutex<Connection>`, which is fine for SQLite (which
//! serializes writes anyway).

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use super::kv::KeyValueStore;
use crate::error::StoreError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    tier  TEXT NOT NULL,
    key   TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (tier, key)
);";

pub const PRIMARY_TIER: &str = "primary";
pub const SHARED_TIER: &str = "shared";

/// One tier of a SQLite key-value file. Cloning is cheap (inner `Arc`).
#[derive(Clone)]
pub struct SqliteKv {
    conn: Arc<Mutex<Connection>>,
    tier: String,
}

impl SqliteKv {
    /// Opens (or creates) the store at the given path. The returned handle
    /// addresses the primary tier.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        log::info!("Key-value store opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tier: PRIMARY_TIER.to_string(),
        })
    }

    /// Opens an in-memory store for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tier: PRIMARY_TIER.to_string(),
        })
    }

    /// Another tier sharing this handle's connection.
    pub fn tier(&self, name: &str) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            tier: name.to_string(),
        }
    }

    pub fn tier_name(&self) -> &str {
        &self.tier
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv WHERE tier = ?1 AND key = ?2",
                    params![self.tier, key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (tier, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(tier, key) DO UPDATE SET value = excluded.value",
                params![self.tier, key, value],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM kv WHERE tier = ?1 AND key = ?2",
                params![self.tier, key],
            )?;
            Ok(())
        })
    }

    fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "DELETE FROM kv WHERE tier = ?1 AND key = ?2 RETURNING value",
                    params![self.tier, key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }
}
