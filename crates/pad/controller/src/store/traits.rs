//! Storage trait definitions

use crate::error::StoreError;
use async_trait::async_trait;
use pad_types::{AnomalyDetector, ObjectKey, Workload};
use serde::{Deserialize, Serialize};

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to desired-state records
#[async_trait]
pub trait DetectorStore: Send + Sync {
    /// Get a detector by key, `None` if it does not exist
    async fn get_detector(&self, key: &ObjectKey) -> StoreResult<Option<AnomalyDetector>>;

    /// List all detectors
    async fn list_detectors(&self) -> StoreResult<Vec<AnomalyDetector>>;
}

/// Access to live workload records
#[async_trait]
pub trait WorkloadStore: Send + Sync {
    /// Get a workload by key, `None` if it does not exist
    async fn get_workload(&self, key: &ObjectKey) -> StoreResult<Option<Workload>>;

    /// Store a new workload. Fails with `AlreadyExists` if the key is taken.
    async fn create_workload(&self, workload: Workload) -> StoreResult<Workload>;

    /// Replace an existing workload. The record must carry the current
    /// resource version, otherwise the update fails with `Conflict`.
    async fn update_workload(&self, workload: Workload) -> StoreResult<Workload>;
}

/// Combined storage trait
pub trait RecordStore: DetectorStore + WorkloadStore {}

impl<T: DetectorStore + WorkloadStore> RecordStore for T {}

/// Record kinds carried on the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Detector,
    Workload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Notification that a record changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEvent {
    pub kind: RecordKind,
    pub key: ObjectKey,
    /// Controlling owner of the changed record, if any
    pub owner: Option<ObjectKey>,
    pub change: ChangeKind,
}

impl StoreEvent {
    /// Detector whose reconciliation this change should trigger.
    ///
    /// Detector changes map to themselves, workload changes to their owner.
    /// Unowned workloads trigger nothing.
    pub fn reconcile_key(&self) -> Option<ObjectKey> {
        match self.kind {
            RecordKind::Detector => Some(self.key.clone()),
            RecordKind::Workload => self.owner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_key_mapping() {
        let detector = ObjectKey::new("default", "pad");
        let event = StoreEvent {
            kind: RecordKind::Detector,
            key: detector.clone(),
            owner: None,
            change: ChangeKind::Updated,
        };
        assert_eq!(event.reconcile_key(), Some(detector.clone()));

        let owned = StoreEvent {
            kind: RecordKind::Workload,
            key: ObjectKey::new("default", "pad"),
            owner: Some(detector.clone()),
            change: ChangeKind::Deleted,
        };
        assert_eq!(owned.reconcile_key(), Some(detector));

        let orphan = StoreEvent {
            kind: RecordKind::Workload,
            key: ObjectKey::new("default", "stray"),
            owner: None,
            change: ChangeKind::Created,
        };
        assert_eq!(orphan.reconcile_key(), None);
    }
}
