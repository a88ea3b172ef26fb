//! In-memory storage implementation

use super::traits::*;
use crate::error::StoreError;
use async_trait::async_trait;
use pad_types::{AnomalyDetector, ObjectKey, Workload};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// In-memory record store for development and testing.
///
/// Assigns resource versions, enforces optimistic concurrency on workload
/// updates, cascades detector deletion to owned workloads and publishes a
/// [`StoreEvent`] for every change.
#[derive(Debug)]
pub struct InMemoryStore {
    detectors: Arc<RwLock<HashMap<ObjectKey, AnomalyDetector>>>,
    workloads: Arc<RwLock<HashMap<ObjectKey, Workload>>>,
    workload_writes: AtomicU64,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            detectors: Arc::new(RwLock::new(HashMap::new())),
            workloads: Arc::new(RwLock::new(HashMap::new())),
            workload_writes: AtomicU64::new(0),
            events,
        }
    }

    /// Subscribe to the change feed
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Number of successful workload creates and updates
    pub fn workload_writes(&self) -> u64 {
        self.workload_writes.load(Ordering::SeqCst)
    }

    /// Create or update a detector.
    ///
    /// Updating keeps the stored uid and creation time, so the identity of an
    /// existing detector never changes.
    pub async fn upsert_detector(&self, mut detector: AnomalyDetector) -> StoreResult<AnomalyDetector> {
        let key = detector.key();
        if key.name.is_empty() || key.namespace.is_empty() {
            return Err(StoreError::Invalid(format!(
                "detector needs a name and namespace, got {key}"
            )));
        }

        let mut detectors = self.detectors.write().await;
        let change = match detectors.get(&key) {
            Some(existing) => {
                detector.metadata.uid = existing.metadata.uid;
                detector.metadata.created_at = existing.metadata.created_at;
                detector.metadata.resource_version = existing.metadata.resource_version + 1;
                ChangeKind::Updated
            }
            None => {
                detector.metadata.resource_version = 1;
                ChangeKind::Created
            }
        };
        detectors.insert(key.clone(), detector.clone());
        drop(detectors);

        self.publish(RecordKind::Detector, key, None, change);
        Ok(detector)
    }

    /// Delete a detector and every workload it controls
    pub async fn delete_detector(&self, key: &ObjectKey) -> StoreResult<bool> {
        let removed = self.detectors.write().await.remove(key);
        let Some(detector) = removed else {
            return Ok(false);
        };
        self.publish(RecordKind::Detector, key.clone(), None, ChangeKind::Deleted);

        let orphaned: Vec<Workload> = {
            let mut workloads = self.workloads.write().await;
            let owned: Vec<ObjectKey> = workloads
                .values()
                .filter(|w| w.metadata.is_owned_by(&detector.metadata.uid))
                .map(Workload::key)
                .collect();
            owned
                .iter()
                .filter_map(|k| workloads.remove(k))
                .collect()
        };

        for workload in orphaned {
            tracing::debug!(workload = %workload.key(), owner = %key, "Cascading delete");
            self.publish(
                RecordKind::Workload,
                workload.key(),
                workload.metadata.owner_key(),
                ChangeKind::Deleted,
            );
        }

        Ok(true)
    }

    /// Delete a workload directly
    pub async fn delete_workload(&self, key: &ObjectKey) -> StoreResult<bool> {
        let removed = self.workloads.write().await.remove(key);
        match removed {
            Some(workload) => {
                self.publish(
                    RecordKind::Workload,
                    key.clone(),
                    workload.metadata.owner_key(),
                    ChangeKind::Deleted,
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// List all workloads
    pub async fn list_workloads(&self) -> StoreResult<Vec<Workload>> {
        let workloads = self.workloads.read().await;
        Ok(workloads.values().cloned().collect())
    }

    fn publish(&self, kind: RecordKind, key: ObjectKey, owner: Option<ObjectKey>, change: ChangeKind) {
        let _ = self.events.send(StoreEvent {
            kind,
            key,
            owner,
            change,
        });
    }
}

#[async_trait]
impl DetectorStore for InMemoryStore {
    async fn get_detector(&self, key: &ObjectKey) -> StoreResult<Option<AnomalyDetector>> {
        let detectors = self.detectors.read().await;
        Ok(detectors.get(key).cloned())
    }

    async fn list_detectors(&self) -> StoreResult<Vec<AnomalyDetector>> {
        let detectors = self.detectors.read().await;
        Ok(detectors.values().cloned().collect())
    }
}

#[async_trait]
impl WorkloadStore for InMemoryStore {
    async fn get_workload(&self, key: &ObjectKey) -> StoreResult<Option<Workload>> {
        let workloads = self.workloads.read().await;
        Ok(workloads.get(key).cloned())
    }

    async fn create_workload(&self, mut workload: Workload) -> StoreResult<Workload> {
        let key = workload.key();
        let mut workloads = self.workloads.write().await;
        if workloads.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }

        workload.metadata.resource_version = 1;
        workloads.insert(key.clone(), workload.clone());
        drop(workloads);

        self.workload_writes.fetch_add(1, Ordering::SeqCst);
        self.publish(
            RecordKind::Workload,
            key,
            workload.metadata.owner_key(),
            ChangeKind::Created,
        );
        Ok(workload)
    }

    async fn update_workload(&self, mut workload: Workload) -> StoreResult<Workload> {
        let key = workload.key();
        let mut workloads = self.workloads.write().await;
        let Some(existing) = workloads.get(&key) else {
            return Err(StoreError::NotFound(key.to_string()));
        };

        let current = existing.metadata.resource_version;
        if workload.metadata.resource_version != current {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected: workload.metadata.resource_version,
                actual: current,
            });
        }

        workload.metadata.uid = existing.metadata.uid;
        workload.metadata.created_at = existing.metadata.created_at;
        workload.metadata.resource_version = current + 1;
        workloads.insert(key.clone(), workload.clone());
        drop(workloads);

        self.workload_writes.fetch_add(1, Ordering::SeqCst);
        self.publish(
            RecordKind::Workload,
            key,
            workload.metadata.owner_key(),
            ChangeKind::Updated,
        );
        Ok(workload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_workload;
    use pad_types::AnomalyDetectorSpec;

    fn sample_detector() -> AnomalyDetector {
        AnomalyDetector::new("monitoring", "pad-sample", AnomalyDetectorSpec::default())
    }

    #[tokio::test]
    async fn test_upsert_keeps_identity() {
        let store = InMemoryStore::new();
        let created = store.upsert_detector(sample_detector()).await.unwrap();
        assert_eq!(created.metadata.resource_version, 1);

        let mut replacement = sample_detector();
        replacement.spec.replica_count = 5;
        let updated = store.upsert_detector(replacement).await.unwrap();

        assert_eq!(updated.metadata.uid, created.metadata.uid);
        assert_eq!(updated.metadata.resource_version, 2);
        assert_eq!(updated.spec.replica_count, 5);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let store = InMemoryStore::new();
        let workload = render_workload(&sample_detector());

        store.create_workload(workload.clone()).await.unwrap();
        let err = store.create_workload(workload).await.unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.workload_writes(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_current_version() {
        let store = InMemoryStore::new();
        let stored = store
            .create_workload(render_workload(&sample_detector()))
            .await
            .unwrap();

        let mut first = stored.clone();
        first.spec.replicas = 2;
        let first = store.update_workload(first).await.unwrap();
        assert_eq!(first.metadata.resource_version, 2);

        let mut stale = stored;
        stale.spec.replicas = 3;
        let err = store.update_workload(stale).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                key: "monitoring/pad-sample".into(),
                expected: 1,
                actual: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_update_missing_workload() {
        let store = InMemoryStore::new();
        let err = store
            .update_workload(render_workload(&sample_detector()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_detector_cascades_to_owned_workloads() {
        let store = InMemoryStore::new();
        let detector = store.upsert_detector(sample_detector()).await.unwrap();
        store
            .create_workload(render_workload(&detector))
            .await
            .unwrap();

        let mut unrelated = render_workload(&AnomalyDetector::new(
            "monitoring",
            "other",
            AnomalyDetectorSpec::default(),
        ));
        unrelated.metadata.owner = None;
        store.create_workload(unrelated).await.unwrap();

        let mut feed = store.subscribe();
        assert!(store.delete_detector(&detector.key()).await.unwrap());

        assert!(store.get_workload(&detector.key()).await.unwrap().is_none());
        assert_eq!(store.list_workloads().await.unwrap().len(), 1);

        let first = feed.recv().await.unwrap();
        assert_eq!(first.kind, RecordKind::Detector);
        assert_eq!(first.change, ChangeKind::Deleted);
        let second = feed.recv().await.unwrap();
        assert_eq!(second.kind, RecordKind::Workload);
        assert_eq!(second.reconcile_key(), Some(detector.key()));
    }

    #[tokio::test]
    async fn test_change_feed_reports_owner() {
        let store = InMemoryStore::new();
        let mut feed = store.subscribe();
        let detector = store.upsert_detector(sample_detector()).await.unwrap();
        store
            .create_workload(render_workload(&detector))
            .await
            .unwrap();

        let detector_event = feed.recv().await.unwrap();
        assert_eq!(detector_event.change, ChangeKind::Created);
        assert_eq!(detector_event.reconcile_key(), Some(detector.key()));

        let workload_event = feed.recv().await.unwrap();
        assert_eq!(workload_event.kind, RecordKind::Workload);
        assert_eq!(workload_event.owner, Some(detector.key()));
    }
}
