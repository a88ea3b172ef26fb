//! Controller events
//!
//! Every reconciliation pass publishes one event describing what it did.
//! Subscribers read them from a broadcast channel; nobody listening is not
//! an error.

use chrono::{DateTime, Utc};
use pad_types::ObjectKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a reconciliation pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Detector no longer exists
    DesiredAbsent { key: ObjectKey },
    /// Workload was missing and has been created
    WorkloadCreated { key: ObjectKey, replicas: u32 },
    /// Diverged fields were overwritten
    WorkloadPatched { key: ObjectKey, fields: Vec<String> },
    /// Nothing to change
    InSync { key: ObjectKey },
    /// Pass ended with an error
    ReconcileFailed { key: ObjectKey, reason: String },
}

impl ControllerEvent {
    pub fn key(&self) -> &ObjectKey {
        match self {
            ControllerEvent::DesiredAbsent { key }
            | ControllerEvent::WorkloadCreated { key, .. }
            | ControllerEvent::WorkloadPatched { key, .. }
            | ControllerEvent::InSync { key }
            | ControllerEvent::ReconcileFailed { key, .. } => key,
        }
    }
}

/// Event plus the pass that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerEventEnvelope {
    pub id: Uuid,
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: ControllerEvent,
}

impl ControllerEventEnvelope {
    pub fn new(request_id: Uuid, event: ControllerEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            timestamp: Utc::now(),
            event,
        }
    }
}
