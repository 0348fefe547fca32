//! Reconciles the attribution callback and the deep-link callback.
//!
//! The two SDK signals arrive independently, in either order, and either may
//! never arrive. Attribution arms a debounce window; a deep link arriving
//! inside it (or already buffered) merges immediately, otherwise the window
//! expiring emits attribution alone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::merge::merge_deeplink;
use crate::store::codec::coerce_string_map;
use crate::store::DataStore;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Default)]
struct BufferState {
    attribution: Option<HashMap<String, String>>,
    deeplink: Option<HashMap<String, String>>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is armed or cancelled; a firing timer only
    /// merges if its epoch is still current.
    timer_epoch: u64,
}

impl BufferState {
    fn cancel_timer(&mut self) {
        self.timer_epoch += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    state: Mutex<BufferState>,
    store: Arc<dyn DataStore>,
    resolved_tx: broadcast::Sender<HashMap<String, String>>,
}

impl Shared {
    /// Merges the buffers and emits the result. Caller holds the state lock.
    fn merge_and_emit(&self, state: &mut BufferState) {
        state.cancel_timer();

        let empty = HashMap::new();
        let attribution = state.attribution.as_ref().unwrap_or(&empty);
        let deeplink = state.deeplink.as_ref().unwrap_or(&empty);
        let merged = merge_deeplink(attribution, deeplink);

        if let Err(e) = self.store.save_attribution(&merged) {
            warn!("Failed to persist merged attribution: {}", e);
        }

        info!(
            "Attribution resolved ({} fields, {} from deep link)",
            merged.len(),
            deeplink.len()
        );
        // No subscriber yet is fine.
        let _ = self.resolved_tx.send(merged);
    }
}

/// Single-writer buffer for attribution and deep-link data.
///
/// Construct once per process and share by `Arc`; the receive methods may be
/// called from any thread.
pub struct AttributionBuffer {
    shared: Arc<Shared>,
    deeplink_tx: broadcast::Sender<HashMap<String, String>>,
    merge_window: Duration,
    runtime: Handle,
}

impl AttributionBuffer {
    /// Merge timers are spawned on `runtime`.
    pub fn new(store: Arc<dyn DataStore>, merge_window: Duration, runtime: Handle) -> Self {
        let (resolved_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (deeplink_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BufferState::default()),
                store,
                resolved_tx,
            }),
            deeplink_tx,
            merge_window,
            runtime,
        }
    }

    /// Merged attribution records, one per merge.
    pub fn subscribe_resolved(&self) -> broadcast::Receiver<HashMap<String, String>> {
        self.shared.resolved_tx.subscribe()
    }

    /// Raw deep-link data as soon as it is accepted, for early routing.
    pub fn subscribe_deeplinks(&self) -> broadcast::Receiver<HashMap<String, String>> {
        self.deeplink_tx.subscribe()
    }

    pub fn receive_attribution(&self, data: HashMap<String, String>) {
        debug!("Attribution received ({} fields)", data.len());
        if let Err(e) = self.shared.store.save_attribution(&data) {
            warn!("Failed to persist attribution: {}", e);
        }

        let Ok(mut state) = self.shared.state.lock() else {
            warn!("Attribution buffer lock poisoned, dropping attribution");
            return;
        };
        state.attribution = Some(data);

        if state.deeplink.is_some() {
            self.shared.merge_and_emit(&mut state);
        } else {
            self.arm_timer(&mut state);
        }
    }

    /// Attribution SDK failure, surfaced as data rather than an error.
    pub fn receive_attribution_failure(&self, description: &str) {
        let mut data = HashMap::new();
        data.insert("error".to_string(), "true".to_string());
        data.insert("error_desc".to_string(), description.to_string());
        self.receive_attribution(data);
    }

    pub fn receive_raw_attribution(&self, data: &Map<String, Value>) {
        self.receive_attribution(coerce_string_map(data));
    }

    /// Deep links are only honoured until the install has completed once.
    pub fn receive_deeplink(&self, data: HashMap<String, String>) {
        match self.shared.store.is_installed() {
            Ok(true) => {
                debug!("Ignoring deep link delivered after install");
                return;
            }
            Ok(false) => {}
            Err(e) => warn!("Failed to read install flag: {}", e),
        }

        debug!("Deep link received ({} fields)", data.len());
        if let Err(e) = self.shared.store.save_deeplink(&data) {
            warn!("Failed to persist deep link: {}", e);
        }
        let _ = self.deeplink_tx.send(data.clone());

        let Ok(mut state) = self.shared.state.lock() else {
            warn!("Attribution buffer lock poisoned, dropping deep link");
            return;
        };
        state.deeplink = Some(data);
        state.cancel_timer();

        if state.attribution.is_some() {
            self.shared.merge_and_emit(&mut state);
        }
    }

    pub fn receive_raw_deeplink(&self, data: &Map<String, Value>) {
        self.receive_deeplink(coerce_string_map(data));
    }

    fn arm_timer(&self, state: &mut BufferState) {
        state.cancel_timer();
        let epoch = state.timer_epoch;
        let shared = Arc::clone(&self.shared);
        let window = self.merge_window;

        state.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let Ok(mut state) = shared.state.lock() else {
                return;
            };
            if state.timer_epoch == epoch {
                debug!("Merge window elapsed without deep link");
                state.timer = None;
                shared.merge_and_emit(&mut state);
            }
        }));
    }
}

impl Drop for AttributionBuffer {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.cancel_timer();
        }
    }
}
