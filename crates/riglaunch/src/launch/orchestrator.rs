use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{LaunchSignal, PermissionDecision};
use crate::attribution::AttributionBuffer;
use crate::config::LaunchConfig;
use crate::error::{RigLaunchError, StoreError};
use crate::gateway::NetworkGateway;
use crate::pipeline::{BroadcastProgress, Outcome, Pipeline, PipelineConfig, ProgressEvent};
use crate::push::PushIngestor;
use crate::store::DataStore;

const PROGRESS_CAPACITY: usize = 64;

#[derive(Default)]
struct Tasks {
    started: bool,
    timeout: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    connectivity: Option<JoinHandle<()>>,
    run: Option<JoinHandle<()>>,
}

impl Tasks {
    fn abort_all(&mut self) {
        for task in [
            self.timeout.take(),
            self.listener.take(),
            self.connectivity.take(),
            self.run.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}

struct Inner {
    config: Arc<LaunchConfig>,
    store: Arc<dyn DataStore>,
    pipeline: Pipeline,
    buffer: AttributionBuffer,
    push: PushIngestor,
    progress: BroadcastProgress,
    runtime: Handle,
    signal_tx: watch::Sender<LaunchSignal>,
    tasks: Mutex<Tasks>,
    /// Identifies the newest pipeline run; older runs never publish.
    generation: AtomicU64,
}

impl Inner {
    fn tasks(&self) -> std::sync::MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_resolved(&self) -> bool {
        self.signal_tx.borrow().is_resolved()
    }

    /// Publishes the terminal outcome. Returns false if one was already
    /// published.
    fn resolve(&self, outcome: Outcome) -> bool {
        let published = self.signal_tx.send_if_modified(|signal| {
            if signal.is_resolved() {
                return false;
            }
            *signal = LaunchSignal::Resolved(outcome.clone());
            true
        });
        if !published {
            debug!(rejected = ?outcome, "Launch already resolved");
            return false;
        }

        if let Some(timeout) = self.tasks().timeout.take() {
            timeout.abort();
        }
        if let Some(url) = outcome.url() {
            if let Err(e) = self.store.save_url(url) {
                warn!(error = %e, "Failed to save destination URL");
            }
        }
        info!(outcome = ?outcome, "Launch resolved");
        true
    }

    fn set_offline(&self, offline: bool) {
        let changed = self.signal_tx.send_if_modified(|signal| {
            let next = match (&*signal, offline) {
                (LaunchSignal::Pending, true) => LaunchSignal::Offline,
                (LaunchSignal::Offline, false) => LaunchSignal::Pending,
                _ => return false,
            };
            *signal = next;
            true
        });
        if changed {
            info!(offline, "Connectivity changed before launch resolved");
        }
    }

    /// Cancels any in-flight run and starts a new one from the first step.
    fn restart_pipeline(self: &Arc<Self>) {
        if self.is_resolved() {
            debug!("Launch already resolved, not re-running pipeline");
            return;
        }
        // Bumping the generation and swapping the handle happen under one
        // lock, so the newest run is always the one left alive.
        let mut tasks = self.tasks();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(self);
        let run = self.runtime.spawn(async move {
            let ctx = inner.pipeline.run(&inner.progress).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "Discarding superseded pipeline run");
                return;
            }
            inner.resolve(ctx.outcome().clone());
        });

        if let Some(previous) = tasks.run.replace(run) {
            debug!(generation, "Cancelling in-flight pipeline run");
            previous.abort();
        }
    }
}

/// Owns one launch: the attribution buffer, the pipeline runs it triggers,
/// the launch timeout and the connectivity watch.
///
/// Call [`start`](Self::start), then feed attribution and deep links through
/// [`buffer`](Self::buffer). Every task runs on the runtime captured at
/// construction, so the methods may be called from any thread.
pub struct LaunchOrchestrator {
    inner: Arc<Inner>,
}

impl LaunchOrchestrator {
    /// Uses the runtime of the calling context; fails outside one.
    pub fn new(
        config: Arc<LaunchConfig>,
        store: Arc<dyn DataStore>,
        gateway: Arc<dyn NetworkGateway>,
    ) -> Result<Self, RigLaunchError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(config, store, gateway, runtime))
    }

    pub fn with_runtime(
        config: Arc<LaunchConfig>,
        store: Arc<dyn DataStore>,
        gateway: Arc<dyn NetworkGateway>,
        runtime: Handle,
    ) -> Self {
        let pipeline = Pipeline::new(
            PipelineConfig::from_config(&config),
            Arc::clone(&store),
            gateway,
        );
        let buffer = AttributionBuffer::new(
            Arc::clone(&store),
            config.timing.merge_window(),
            runtime.clone(),
        );
        let push = PushIngestor::new(Arc::clone(&store));
        let (signal_tx, _) = watch::channel(LaunchSignal::Pending);

        Self {
            inner: Arc::new(Inner {
                config,
                store,
                pipeline,
                buffer,
                push,
                progress: BroadcastProgress::new(PROGRESS_CAPACITY),
                runtime,
                signal_tx,
                tasks: Mutex::new(Tasks::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Arms the launch timeout, starts listening for merged attribution and
    /// follows `connectivity` (`true` = online). A second call is ignored.
    pub fn start(&self, connectivity: watch::Receiver<bool>) {
        let mut tasks = self.inner.tasks();
        if tasks.started {
            warn!("Launch already started");
            return;
        }
        tasks.started = true;

        let timeout = self.inner.config.timing.launch_timeout();
        info!(timeout = ?timeout, "Launch started");

        let inner = Arc::clone(&self.inner);
        tasks.timeout = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if inner.resolve(Outcome::GoToMain) {
                warn!(timeout = ?timeout, "Launch timed out, falling back to main");
                if let Some(run) = inner.tasks().run.take() {
                    run.abort();
                }
            }
        }));

        let inner = Arc::clone(&self.inner);
        let mut resolved = self.inner.buffer.subscribe_resolved();
        tasks.listener = Some(self.inner.runtime.spawn(async move {
            loop {
                match resolved.recv().await {
                    Ok(merged) => {
                        debug!(fields = merged.len(), "Attribution resolved, running pipeline");
                        inner.restart_pipeline();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed attribution updates, running pipeline");
                        inner.restart_pipeline();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        let inner = Arc::clone(&self.inner);
        tasks.connectivity = Some(self.inner.runtime.spawn(async move {
            let mut connectivity = connectivity;
            loop {
                let online = *connectivity.borrow_and_update();
                inner.set_offline(!online);
                if connectivity.changed().await.is_err() {
                    debug!("Connectivity source closed");
                    break;
                }
            }
        }));
    }

    /// Runs the pipeline on whatever is already stored, without waiting for
    /// an attribution callback.
    pub fn trigger(&self) {
        self.inner.restart_pipeline();
    }

    pub fn buffer(&self) -> &AttributionBuffer {
        &self.inner.buffer
    }

    pub fn receive_attribution(&self, data: HashMap<String, String>) {
        self.inner.buffer.receive_attribution(data);
    }

    pub fn receive_deeplink(&self, data: HashMap<String, String>) {
        self.inner.buffer.receive_deeplink(data);
    }

    pub fn push(&self) -> &PushIngestor {
        &self.inner.push
    }

    /// Parks a notification's URL for the next pipeline run.
    pub fn ingest_push(&self, payload: &Value) -> Option<String> {
        self.inner.push.ingest(payload)
    }

    pub fn signal(&self) -> LaunchSignal {
        self.inner.signal_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LaunchSignal> {
        self.inner.signal_tx.subscribe()
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.inner.progress.subscribe()
    }

    /// Waits for the terminal outcome of this launch.
    pub async fn wait_resolved(&self) -> Outcome {
        let mut rx = self.inner.signal_tx.subscribe();
        let signal = rx.wait_for(LaunchSignal::is_resolved).await;
        match signal {
            Ok(signal) => signal.outcome().cloned().unwrap_or(Outcome::GoToMain),
            Err(_) => Outcome::GoToMain,
        }
    }

    pub fn record_permission(&self, decision: PermissionDecision) -> Result<(), StoreError> {
        let (granted, blocked) = decision.flags();
        self.inner.store.save_permission(granted, blocked)?;
        info!(?decision, "Permission decision recorded");
        Ok(())
    }

    /// Stops every task this launch spawned. The published signal is kept.
    pub fn shutdown(&self) {
        self.inner.tasks().abort_all();
        debug!("Launch tasks stopped");
    }
}

impl Drop for LaunchOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
