//! Dispatcher loop
//!
//! Feeds detector keys from the store's change feed and a periodic resync
//! into a [`WorkQueue`], then runs reconciliation passes on a bounded pool of
//! tasks. Follow-up work requested by a pass (requeue, backoff after an
//! error) goes back through the same queue, so per-key serialization holds
//! for every source of work.

use super::backoff::backoff_delay;
use super::queue::WorkQueue;
use pad_controller::context::wait_for_cancel;
use pad_controller::{Action, DetectorStore, ReconcileContext, Reconciler, StoreEvent};
use pad_types::ObjectKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex, Notify, Semaphore};
use tokio::task::JoinSet;
use tokio::time::interval;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum passes running at once across all keys
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciles: usize,

    /// First retry delay after a failed pass
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Retry delay ceiling
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,

    /// Interval between full resyncs of every detector
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: default_max_concurrent(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
            resync_interval_secs: default_resync_interval(),
        }
    }
}

impl DispatcherConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    /// Never shorter than one second
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }
}

fn default_max_concurrent() -> usize {
    4
}

fn default_backoff_base() -> u64 {
    500
}

fn default_backoff_max() -> u64 {
    300
}

fn default_resync_interval() -> u64 {
    600
}

/// Drives the reconciler from change notifications
pub struct Dispatcher {
    reconciler: Arc<Reconciler>,
    store: Arc<dyn DetectorStore>,
    config: DispatcherConfig,
    queue: Mutex<WorkQueue>,
    ready: Notify,
    failures: Mutex<HashMap<ObjectKey, u32>>,
    shutdown: watch::Sender<bool>,
}

impl Dispatcher {
    /// Create a dispatcher. `store` is used to list detectors on resync.
    pub fn new(
        reconciler: Arc<Reconciler>,
        store: Arc<dyn DetectorStore>,
        config: DispatcherConfig,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            reconciler,
            store,
            config,
            queue: Mutex::new(WorkQueue::new()),
            ready: Notify::new(),
            failures: Mutex::new(HashMap::new()),
            shutdown,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Queue a detector for reconciliation
    pub async fn enqueue(&self, key: ObjectKey) {
        if self.queue.lock().await.add(key) {
            self.ready.notify_one();
        }
    }

    /// Queue every detector currently in the store
    pub async fn resync(&self) {
        match self.store.list_detectors().await {
            Ok(detectors) => {
                tracing::debug!(count = detectors.len(), "Resyncing detectors");
                for detector in detectors {
                    self.enqueue(detector.key()).await;
                }
            }
            Err(e) => tracing::error!(error = %e, "Resync failed to list detectors"),
        }
    }

    /// Consecutive failures recorded for a key
    pub async fn failure_count(&self, key: &ObjectKey) -> u32 {
        self.failures.lock().await.get(key).copied().unwrap_or(0)
    }

    /// Signal the run loop to stop. In-flight passes are cancelled.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Run until [`stop`](Self::stop) is called, consuming `events` from the
    /// store's change feed.
    pub async fn run(self: Arc<Self>, events: broadcast::Receiver<StoreEvent>) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent_reconciles,
            "Dispatcher started"
        );

        let feed = tokio::spawn(self.clone().forward_events(events));
        let resync = tokio::spawn(self.clone().resync_loop());

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_reconciles.max(1)));
        let mut workers = JoinSet::new();
        let shutdown = self.shutdown.subscribe();

        loop {
            let permit = tokio::select! {
                _ = wait_for_cancel(shutdown.clone()) => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let key = tokio::select! {
                _ = wait_for_cancel(shutdown.clone()) => break,
                key = self.next_key() => key,
            };

            let dispatcher = self.clone();
            workers.spawn(async move {
                dispatcher.process(key).await;
                drop(permit);
            });

            while let Some(result) = workers.try_join_next() {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Reconcile worker panicked");
                }
            }
        }

        feed.abort();
        resync.abort();
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Reconcile worker panicked");
            }
        }

        tracing::info!("Dispatcher stopped");
    }

    async fn next_key(&self) -> ObjectKey {
        loop {
            if let Some(key) = self.queue.lock().await.take() {
                return key;
            }
            self.ready.notified().await;
        }
    }

    async fn forward_events(self: Arc<Self>, mut events: broadcast::Receiver<StoreEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(key) = event.reconcile_key() {
                        tracing::trace!(key = %key, change = ?event.change, "Store change");
                        self.enqueue(key).await;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change feed lagged, resyncing");
                    self.resync().await;
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Change feed closed");
                    break;
                }
            }
        }
    }

    async fn resync_loop(self: Arc<Self>) {
        // First tick fires immediately and picks up records loaded before start.
        let mut ticker = interval(self.config.resync_interval());
        loop {
            ticker.tick().await;
            self.resync().await;
        }
    }

    async fn process(self: Arc<Self>, key: ObjectKey) {
        let ctx = ReconcileContext::new().with_cancellation(self.shutdown.subscribe());
        let result = self.reconciler.reconcile(&key, &ctx).await;

        if self.queue.lock().await.finish(&key) {
            self.ready.notify_one();
        }

        match result {
            Ok(action) => {
                self.failures.lock().await.remove(&key);
                match action {
                    Action::Done => {}
                    Action::RequeueImmediate => self.enqueue(key).await,
                    Action::RequeueAfter(delay) => self.requeue_after(key, delay),
                }
            }
            Err(e) if e.is_cancelled() => {
                tracing::debug!(key = %key, "Reconcile cancelled, not retrying");
            }
            Err(_) => {
                let failures = {
                    let mut failures = self.failures.lock().await;
                    let count = failures.entry(key.clone()).or_insert(0);
                    *count = count.saturating_add(1);
                    *count
                };
                let delay = backoff_delay(
                    failures,
                    self.config.backoff_base(),
                    self.config.backoff_max(),
                );
                tracing::debug!(
                    key = %key,
                    failures,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after backoff"
                );
                self.requeue_after(key, delay);
            }
        }
    }

    /// Enqueue `key` once `delay` elapses, unless the dispatcher stops first
    fn requeue_after(self: &Arc<Self>, key: ObjectKey, delay: Duration) {
        let dispatcher = self.clone();
        let shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_cancel(shutdown) => {}
                _ = tokio::time::sleep(delay) => dispatcher.enqueue(key).await,
            }
        });
    }
}
