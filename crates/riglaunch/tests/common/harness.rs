//! Test harness for isolated launch runs.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use riglaunch::gateway::{self, NetworkGateway};
use riglaunch::pipeline::{Pipeline, PipelineConfig, ProgressEvent, ProgressReporter};
use riglaunch::{DiskStore, GatewayError, LaunchConfig, LaunchOrchestrator, SqliteKv};

/// Scripted remote endpoints. Responses are consumed in call order; an empty
/// script answers validation with `true` and everything else with a failure.
#[derive(Default)]
pub struct FakeGateway {
    validate: Mutex<VecDeque<gateway::Result<bool>>>,
    attribution: Mutex<VecDeque<gateway::Result<HashMap<String, String>>>>,
    destination: Mutex<VecDeque<gateway::Result<String>>>,
    destination_delay: Mutex<Duration>,
    sent: Mutex<Vec<HashMap<String, String>>>,
    validate_calls: AtomicUsize,
    attribution_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_validate(&self, result: gateway::Result<bool>) -> &Self {
        self.validate.lock().unwrap().push_back(result);
        self
    }

    pub fn push_attribution(&self, result: gateway::Result<HashMap<String, String>>) -> &Self {
        self.attribution.lock().unwrap().push_back(result);
        self
    }

    pub fn push_destination(&self, result: gateway::Result<String>) -> &Self {
        self.destination.lock().unwrap().push_back(result);
        self
    }

    /// Every destination call waits this long before answering.
    pub fn set_destination_delay(&self, delay: Duration) {
        *self.destination_delay.lock().unwrap() = delay;
    }

    /// Attribution maps passed to `fetch_destination`, in call order.
    pub fn sent_attribution(&self) -> Vec<HashMap<String, String>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn attribution_calls(&self) -> usize {
        self.attribution_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkGateway for FakeGateway {
    async fn validate(&self) -> gateway::Result<bool> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.validate.lock().unwrap().pop_front().unwrap_or(Ok(true))
    }

    async fn fetch_attribution(&self) -> gateway::Result<HashMap<String, String>> {
        self.attribution_calls.fetch_add(1, Ordering::SeqCst);
        self.attribution
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::RequestFailed("unscripted".to_string())))
    }

    async fn fetch_destination(
        &self,
        attribution: &HashMap<String, String>,
    ) -> gateway::Result<String> {
        self.sent.lock().unwrap().push(attribution.clone());
        let response = self
            .destination
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::RequestFailed("unscripted".to_string())));
        let delay = *self.destination_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

/// Keeps every progress event in memory.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Isolated environment: a SQLite store file in a temp directory plus a
/// scripted gateway.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub store: Arc<DiskStore>,
    pub gateway: Arc<FakeGateway>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("riglaunch.db");
        let store = Self::open_store(&db_path);

        Self {
            temp_dir,
            db_path,
            store,
            gateway: Arc::new(FakeGateway::new()),
        }
    }

    fn open_store(path: &Path) -> Arc<DiskStore> {
        let kv = SqliteKv::open(path).expect("Failed to open store");
        Arc::new(DiskStore::from_sqlite(kv))
    }

    /// A second handle on the same database file, as a later launch would see it.
    pub fn reopen_store(&self) -> Arc<DiskStore> {
        Self::open_store(&self.db_path)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            PipelineConfig::default(),
            self.store.clone(),
            self.gateway.clone(),
        )
    }

    pub fn orchestrator(&self, config: LaunchConfig) -> LaunchOrchestrator {
        LaunchOrchestrator::new(Arc::new(config), self.store.clone(), self.gateway.clone())
            .expect("orchestrator needs a runtime")
    }
}
