//! Durable launch state.
//!
//! `DataStore` is the contract the pipeline depends on; `DiskStore` backs it
//! with two key-value tiers (a shared, group-scoped vault and the primary
//! app store).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub mod codec;
pub mod disk;
pub mod kv;
pub mod sqlite;

pub use disk::DiskStore;
pub use kv::{KeyValueStore, MemoryKv};
pub use sqlite::SqliteKv;

/// Snapshot of everything the pipeline needs from durable storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredData {
    pub attribution: HashMap<String, String>,
    pub deeplink: HashMap<String, String>,
    pub url: Option<String>,
    pub mode: Option<String>,
    pub is_first_run: bool,
    pub perm_granted: bool,
    pub perm_blocked: bool,
    pub perm_date: Option<DateTime<Utc>>,
}

impl Default for StoredData {
    fn default() -> Self {
        Self {
            attribution: HashMap::new(),
            deeplink: HashMap::new(),
            url: None,
            mode: None,
            is_first_run: true,
            perm_granted: false,
            perm_blocked: false,
            perm_date: None,
        }
    }
}

pub trait DataStore: Send + Sync {
    fn load(&self) -> Result<StoredData, StoreError>;
    fn save_attribution(&self, data: &HashMap<String, String>) -> Result<(), StoreError>;
    fn save_deeplink(&self, data: &HashMap<String, String>) -> Result<(), StoreError>;
    fn save_url(&self, url: &str) -> Result<(), StoreError>;
    fn save_mode(&self, mode: &str) -> Result<(), StoreError>;
    fn mark_installed(&self) -> Result<(), StoreError>;
    /// Records a permission decision stamped with the current time.
    fn save_permission(&self, granted: bool, blocked: bool) -> Result<(), StoreError>;

    fn is_installed(&self) -> Result<bool, StoreError>;
    fn save_push_token(&self, token: &str) -> Result<(), StoreError>;
    fn push_token(&self) -> Result<Option<String>, StoreError>;

    /// Transient destination delivered by a push notification.
    fn save_temp_url(&self, url: &str) -> Result<(), StoreError>;
    /// Reads and clears the transient destination.
    fn take_temp_url(&self) -> Result<Option<String>, StoreError>;
}
