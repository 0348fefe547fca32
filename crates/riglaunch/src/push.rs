//! Push-notification payload handling.
//!
//! A push may carry a destination URL in one of several nested shapes. The
//! first match is parked in the transient slot, where the pipeline picks it
//! up ahead of any other resolution.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::store::DataStore;

/// Candidate locations, checked in order.
const URL_PATHS: &[&[&str]] = &[
    &["url"],
    &["data", "url"],
    &["aps", "data", "url"],
    &["custom", "target_url"],
];

/// Extracts the destination URL from a push payload.
pub fn extract_push_url(payload: &Value) -> Option<String> {
    URL_PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(payload, |node, key| node.get(*key))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

pub struct PushIngestor {
    store: Arc<dyn DataStore>,
    url_tx: broadcast::Sender<String>,
}

impl PushIngestor {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        let (url_tx, _) = broadcast::channel(16);
        Self { store, url_tx }
    }

    /// URLs parked by [`PushIngestor::ingest`], for consumers that react
    /// while the app is already running.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.url_tx.subscribe()
    }

    /// Parks the payload's URL in the transient slot. Returns the URL when
    /// one was found.
    pub fn ingest(&self, payload: &Value) -> Option<String> {
        let Some(url) = extract_push_url(payload) else {
            debug!("Push payload carries no destination");
            return None;
        };

        if let Err(e) = self.store.save_temp_url(&url) {
            warn!("Failed to park push destination: {}", e);
        }
        info!("Push destination parked");
        let _ = self.url_tx.send(url.clone());
        Some(url)
    }

    /// Persists a freshly issued push token to both store tiers.
    pub fn register_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.save_push_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DiskStore, MemoryKv};
    use serde_json::json;

    #[test]
    fn test_top_level_url_wins() {
        let payload = json!({
            "url": "https://a",
            "data": {"url": "https://b"}
        });
        assert_eq!(extract_push_url(&payload).as_deref(), Some("https://a"));
    }

    #[test]
    fn test_data_url_preferred_over_custom_target() {
        let payload = json!({
            "custom": {"target_url": "https://custom"},
            "data": {"url": "https://data"}
        });
        assert_eq!(extract_push_url(&payload).as_deref(), Some("https://data"));
    }

    #[test]
    fn test_nested_aps_and_custom_shapes() {
        let aps = json!({"aps": {"alert": "hi", "data": {"url": "https://aps"}}});
        assert_eq!(extract_push_url(&aps).as_deref(), Some("https://aps"));

        let custom = json!({"custom": {"target_url": "https://custom"}});
        assert_eq!(extract_push_url(&custom).as_deref(), Some("https://custom"));
    }

    #[test]
    fn test_non_string_url_skipped() {
        let payload = json!({"url": 5, "custom": {"target_url": "https://custom"}});
        assert_eq!(
            extract_push_url(&payload).as_deref(),
            Some("https://custom")
        );
        assert_eq!(extract_push_url(&json!({"aps": {"badge": 1}})), None);
    }

    #[tokio::test]
    async fn test_ingest_parks_url_and_notifies() {
        let store = Arc::new(DiskStore::new(
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryKv::new()),
        ));
        let ingestor = PushIngestor::new(store.clone());
        let mut rx = ingestor.subscribe();

        let url = ingestor.ingest(&json!({"data": {"url": "https://push"}}));
        assert_eq!(url.as_deref(), Some("https://push"));
        assert_eq!(rx.recv().await.unwrap(), "https://push");
        assert_eq!(store.take_temp_url().unwrap().as_deref(), Some("https://push"));

        assert_eq!(ingestor.ingest(&json!({"aps": {}})), None);
        assert_eq!(store.take_temp_url().unwrap(), None);
    }

    #[test]
    fn test_register_token() {
        let store = Arc::new(DiskStore::new(
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryKv::new()),
        ));
        let ingestor = PushIngestor::new(store.clone());
        ingestor.register_token("tok-1").unwrap();
        assert_eq!(store.push_token().unwrap().as_deref(), Some("tok-1"));
    }
}
