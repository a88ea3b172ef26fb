//! Runtime setup and lifecycle management

use crate::config::DaemonConfig;
use crate::error::DaemonResult;
use crate::manifest::load_manifests;
use crate::scheduler::Dispatcher;
use pad_controller::{ControllerEvent, InMemoryStore, Reconciler};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// PAD controller runtime
pub struct ControllerRuntime {
    config: DaemonConfig,
    store: Arc<InMemoryStore>,
    reconciler: Arc<Reconciler>,
    dispatcher: Arc<Dispatcher>,
}

impl ControllerRuntime {
    /// Create a new runtime with the given configuration
    pub fn new(config: DaemonConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let reconciler = Arc::new(Reconciler::new(store.clone(), config.reconciler.clone()));
        let dispatcher = Dispatcher::new(
            reconciler.clone(),
            store.clone(),
            config.dispatcher.clone(),
        );

        Self {
            config,
            store,
            reconciler,
            dispatcher,
        }
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Load the configured manifests into the store. Returns how many
    /// detectors were stored.
    pub async fn load_manifests(&self) -> DaemonResult<usize> {
        let detectors = load_manifests(&self.config.manifests)?;
        let count = detectors.len();
        for detector in detectors {
            let stored = self.store.upsert_detector(detector).await?;
            tracing::info!(key = %stored.key(), "Loaded detector");
        }
        Ok(count)
    }

    /// Run until Ctrl+C or SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then stop the dispatcher and wait for
    /// in-flight passes to finish.
    pub async fn run_until<F>(self, shutdown: F) -> DaemonResult<()>
    where
        F: Future<Output = ()>,
    {
        let changes = self.store.subscribe();
        let loaded = self.load_manifests().await?;
        tracing::info!(detectors = loaded, "PAD controller starting");

        let event_log = tokio::spawn(log_controller_events(self.reconciler.clone()));
        let dispatcher = tokio::spawn(self.dispatcher.clone().run(changes));

        shutdown.await;
        tracing::info!("PAD controller shutting down");

        self.dispatcher.stop();
        if let Err(e) = dispatcher.await {
            tracing::error!(error = %e, "Dispatcher task failed");
        }
        event_log.abort();

        Ok(())
    }
}

async fn log_controller_events(reconciler: Arc<Reconciler>) {
    let mut events = reconciler.subscribe_events();
    loop {
        match events.recv().await {
            Ok(envelope) => match &envelope.event {
                ControllerEvent::WorkloadCreated { key, replicas } => {
                    tracing::debug!(request_id = %envelope.request_id, key = %key, replicas, "workload_created");
                }
                ControllerEvent::WorkloadPatched { key, fields } => {
                    tracing::debug!(request_id = %envelope.request_id, key = %key, fields = ?fields, "workload_patched");
                }
                ControllerEvent::ReconcileFailed { key, reason } => {
                    tracing::debug!(request_id = %envelope.request_id, key = %key, reason = %reason, "reconcile_failed");
                }
                other => {
                    tracing::trace!(request_id = %envelope.request_id, key = %other.key(), event = ?other, "controller event");
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Controller event log lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
