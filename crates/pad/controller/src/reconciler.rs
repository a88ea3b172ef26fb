//! Reconciliation pass
//!
//! One call to [`Reconciler::reconcile`] walks a single detector through:
//!
//! 1. fetch the detector; gone means done
//! 2. validate its spec
//! 3. fetch the workload; missing means create it and requeue immediately
//! 4. diff; in sync means done, drift means patch and requeue after a delay.
//!    A workload the detector does not control is adopted in the same update.
//!
//! The reconciler keeps no state between calls and never retries. Callers
//! decide what to do with errors and must not run two passes for the same
//! key at once.

use crate::comparator::{diff, MutationPlan};
use crate::config::ReconcilerConfig;
use crate::context::ReconcileContext;
use crate::error::{ReconcileError, Result, StoreOperation};
use crate::events::{ControllerEvent, ControllerEventEnvelope};
use crate::render::render_workload;
use crate::store::{RecordStore, StoreResult};
use pad_types::{ObjectKey, OwnerReference, DETECTOR_KIND};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What the caller should do after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing left to do until the next change notification
    Done,
    /// Reconcile again as soon as possible
    RequeueImmediate,
    /// Reconcile again no sooner than the given delay
    RequeueAfter(Duration),
}

/// Converges workloads with their detectors
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    config: ReconcilerConfig,
    event_tx: broadcast::Sender<ControllerEventEnvelope>,
}

impl Reconciler {
    /// Create a reconciler over the given store
    pub fn new(store: Arc<dyn RecordStore>, config: ReconcilerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            store,
            config,
            event_tx,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Subscribe to pass outcomes
    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Run one reconciliation pass for the detector at `key`
    #[instrument(skip(self, ctx), fields(key = %key, request_id = %ctx.request_id))]
    pub async fn reconcile(&self, key: &ObjectKey, ctx: &ReconcileContext) -> Result<Action> {
        match self.reconcile_inner(key, ctx).await {
            Ok(action) => Ok(action),
            Err(e) => {
                if !e.is_cancelled() {
                    warn!(error = %e, "Reconciliation failed");
                }
                self.emit(
                    ctx,
                    ControllerEvent::ReconcileFailed {
                        key: key.clone(),
                        reason: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    async fn reconcile_inner(&self, key: &ObjectKey, ctx: &ReconcileContext) -> Result<Action> {
        let detector = match self
            .call(ctx, StoreOperation::GetDetector, key, self.store.get_detector(key))
            .await?
        {
            Some(detector) => detector,
            None => {
                debug!("Detector no longer exists, nothing to reconcile");
                self.emit(ctx, ControllerEvent::DesiredAbsent { key: key.clone() });
                return Ok(Action::Done);
            }
        };

        detector
            .spec
            .validate()
            .map_err(|source| ReconcileError::InvalidDesiredState {
                key: key.clone(),
                source,
            })?;
        for warning in detector.spec.warnings() {
            warn!(warning = %warning, "Detector spec looks unintended, deploying anyway");
        }

        let live = self
            .call(ctx, StoreOperation::GetWorkload, key, self.store.get_workload(key))
            .await?;

        let Some(mut live) = live else {
            let workload = render_workload(&detector);
            let replicas = workload.replicas();
            self.call(
                ctx,
                StoreOperation::CreateWorkload,
                key,
                self.store.create_workload(workload),
            )
            .await?;

            info!(replicas, image = %detector.spec.image, "Created workload");
            self.emit(
                ctx,
                ControllerEvent::WorkloadCreated {
                    key: key.clone(),
                    replicas,
                },
            );
            return Ok(Action::RequeueImmediate);
        };

        let adopt = !live.metadata.is_owned_by(&detector.metadata.uid);
        if adopt {
            warn!("Workload is not controlled by this detector, adopting it");
            live.metadata.owner = Some(OwnerReference::controller_of(
                DETECTOR_KIND,
                &detector.metadata,
            ));
        }

        let mut fields: Vec<String> = Vec::new();
        if let MutationPlan::Patch(patch) = diff(&detector, &live) {
            fields.extend(patch.changed_fields().into_iter().map(String::from));
            patch.apply_to(&mut live);
        }
        if adopt {
            fields.push("owner".to_string());
        }

        if fields.is_empty() {
            debug!("Workload in sync");
            self.emit(ctx, ControllerEvent::InSync { key: key.clone() });
            return Ok(Action::Done);
        }

        self.call(
            ctx,
            StoreOperation::UpdateWorkload,
            key,
            self.store.update_workload(live),
        )
        .await?;

        info!(fields = ?fields, "Patched drifted workload");
        self.emit(
            ctx,
            ControllerEvent::WorkloadPatched {
                key: key.clone(),
                fields,
            },
        );
        Ok(Action::RequeueAfter(self.config.drift_requeue()))
    }

    /// Await a store call, bounded by the per-call timeout, the caller's
    /// deadline and the caller's cancellation signal.
    async fn call<T, F>(
        &self,
        ctx: &ReconcileContext,
        operation: StoreOperation,
        key: &ObjectKey,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let call_deadline = Instant::now() + self.config.store_timeout();
        let deadline = ctx
            .deadline
            .map_or(call_deadline, |d| d.min(call_deadline));

        // Signals are checked first so a cancelled pass never starts a write.
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(ReconcileError::Cancelled {
                operation,
                key: key.clone(),
            }),
            _ = tokio::time::sleep_until(deadline) => Err(ReconcileError::DeadlineExceeded {
                operation,
                key: key.clone(),
            }),
            result = fut => result.map_err(|e| ReconcileError::from_store(operation, key, e)),
        }
    }

    fn emit(&self, ctx: &ReconcileContext, event: ControllerEvent) {
        let _ = self
            .event_tx
            .send(ControllerEventEnvelope::new(ctx.request_id, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use pad_types::{AnomalyDetector, AnomalyDetectorSpec};

    fn setup() -> (Arc<InMemoryStore>, Reconciler) {
        let store = Arc::new(InMemoryStore::new());
        let reconciler = Reconciler::new(store.clone(), ReconcilerConfig::default());
        (store, reconciler)
    }

    #[tokio::test]
    async fn test_reconcile_creates_then_settles() {
        let (store, reconciler) = setup();
        let detector = store
            .upsert_detector(AnomalyDetector::new(
                "default",
                "pad",
                AnomalyDetectorSpec::default(),
            ))
            .await
            .unwrap();
        let ctx = ReconcileContext::new();

        let first = reconciler.reconcile(&detector.key(), &ctx).await.unwrap();
        assert_eq!(first, Action::RequeueImmediate);

        let second = reconciler.reconcile(&detector.key(), &ctx).await.unwrap();
        assert_eq!(second, Action::Done);
        assert_eq!(store.workload_writes(), 1);
    }

    #[tokio::test]
    async fn test_invalid_spec_is_rejected_without_writes() {
        let (store, reconciler) = setup();
        let detector = store
            .upsert_detector(AnomalyDetector::new(
                "default",
                "pad",
                AnomalyDetectorSpec::default().with_training_window("forever"),
            ))
            .await
            .unwrap();

        let err = reconciler
            .reconcile(&detector.key(), &ReconcileContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidDesiredState { .. }));
        assert_eq!(store.workload_writes(), 0);
    }

    #[tokio::test]
    async fn test_events_follow_outcome() {
        let (store, reconciler) = setup();
        let mut events = reconciler.subscribe_events();
        let key = ObjectKey::new("default", "missing");
        let ctx = ReconcileContext::new();

        reconciler.reconcile(&key, &ctx).await.unwrap();

        let envelope = events.recv().await.unwrap();
        assert_eq!(envelope.request_id, ctx.request_id);
        assert_eq!(envelope.event, ControllerEvent::DesiredAbsent { key });
        assert_eq!(store.workload_writes(), 0);
    }
}
