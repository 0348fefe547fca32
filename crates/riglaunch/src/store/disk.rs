use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use super::codec::{decode_token, encode_token, json_to_map, map_to_json};
use super::kv::KeyValueStore;
use super::sqlite::{SqliteKv, SHARED_TIER};
use super::{DataStore, StoredData};
use crate::error::StoreError;

mod keys {
    pub const ATTRIBUTION: &str = "rg_attribution_info";
    pub const DEEPLINK: &str = "rg_deeplink_info";
    pub const URL: &str = "rg_destination_url";
    pub const MODE: &str = "rg_mode_setting";
    pub const INSTALLED: &str = "rg_installed_flag";
    pub const PERM_GRANTED: &str = "rg_perm_granted";
    pub const PERM_BLOCKED: &str = "rg_perm_blocked";
    pub const PERM_DATE: &str = "rg_perm_date";
    pub const PUSH_TOKEN: &str = "push_token";
    pub const SHARED_PUSH_TOKEN: &str = "shared_fcm";
    pub const TEMP_URL: &str = "temp_url";
}

/// `DataStore` over two key-value tiers.
///
/// The shared tier is the group-scoped vault a notification extension can
/// read; it holds everything. The primary tier mirrors the URL and push token
/// and owns the transient push URL.
pub struct DiskStore {
    shared: Arc<dyn KeyValueStore>,
    primary: Arc<dyn KeyValueStore>,
}

impl DiskStore {
    pub fn new(shared: Arc<dyn KeyValueStore>, primary: Arc<dyn KeyValueStore>) -> Self {
        Self { shared, primary }
    }

    /// Both tiers in one SQLite file.
    pub fn from_sqlite(primary: SqliteKv) -> Self {
        let shared = primary.tier(SHARED_TIER);
        Self::new(Arc::new(shared), Arc::new(primary))
    }

    fn load_attribution(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self
            .shared
            .get(keys::ATTRIBUTION)?
            .and_then(|json| json_to_map(&json))
            .unwrap_or_default())
    }

    fn load_deeplink(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self
            .shared
            .get(keys::DEEPLINK)?
            .and_then(|encoded| decode_token(&encoded))
            .and_then(|json| json_to_map(&json))
            .unwrap_or_default())
    }

    fn load_url(&self) -> Result<Option<String>, StoreError> {
        match self.shared.get(keys::URL)? {
            Some(url) => Ok(Some(url)),
            None => self.primary.get(keys::URL),
        }
    }

    fn load_perm_date(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .shared
            .get_i64(keys::PERM_DATE)?
            .filter(|millis| *millis > 0)
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()))
    }
}

impl DataStore for DiskStore {
    fn load(&self) -> Result<StoredData, StoreError> {
        Ok(StoredData {
            attribution: self.load_attribution()?,
            deeplink: self.load_deeplink()?,
            url: self.load_url()?,
            mode: self.shared.get(keys::MODE)?,
            is_first_run: !self.shared.get_bool(keys::INSTALLED)?,
            perm_granted: self.shared.get_bool(keys::PERM_GRANTED)?,
            perm_blocked: self.shared.get_bool(keys::PERM_BLOCKED)?,
            perm_date: self.load_perm_date()?,
        })
    }

    fn save_attribution(&self, data: &HashMap<String, String>) -> Result<(), StoreError> {
        self.shared.set(keys::ATTRIBUTION, &map_to_json(data)?)
    }

    fn save_deeplink(&self, data: &HashMap<String, String>) -> Result<(), StoreError> {
        self.shared
            .set(keys::DEEPLINK, &encode_token(&map_to_json(data)?))
    }

    fn save_url(&self, url: &str) -> Result<(), StoreError> {
        self.shared.set(keys::URL, url)?;
        self.primary.set(keys::URL, url)
    }

    fn save_mode(&self, mode: &str) -> Result<(), StoreError> {
        self.shared.set(keys::MODE, mode)
    }

    fn mark_installed(&self) -> Result<(), StoreError> {
        self.shared.set_bool(keys::INSTALLED, true)
    }

    fn save_permission(&self, granted: bool, blocked: bool) -> Result<(), StoreError> {
        self.shared.set_bool(keys::PERM_GRANTED, granted)?;
        self.shared.set_bool(keys::PERM_BLOCKED, blocked)?;
        self.shared
            .set_i64(keys::PERM_DATE, Utc::now().timestamp_millis())
    }

    fn is_installed(&self) -> Result<bool, StoreError> {
        self.shared.get_bool(keys::INSTALLED)
    }

    fn save_push_token(&self, token: &str) -> Result<(), StoreError> {
        self.primary.set(keys::PUSH_TOKEN, token)?;
        self.shared.set(keys::SHARED_PUSH_TOKEN, token)
    }

    fn push_token(&self) -> Result<Option<String>, StoreError> {
        match self.primary.get(keys::PUSH_TOKEN)? {
            Some(token) => Ok(Some(token)),
            None => self.shared.get(keys::SHARED_PUSH_TOKEN),
        }
    }

    fn save_temp_url(&self, url: &str) -> Result<(), StoreError> {
        self.primary.set(keys::TEMP_URL, url)
    }

    fn take_temp_url(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .primary
            .take(keys::TEMP_URL)?
            .filter(|u| !u.is_empty()))
    }
}
