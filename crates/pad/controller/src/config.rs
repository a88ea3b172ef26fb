//! Reconciler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciler tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Delay before re-checking a workload that was just patched
    #[serde(default = "default_drift_requeue")]
    pub drift_requeue_secs: u64,

    /// Upper bound on any single store call
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            drift_requeue_secs: default_drift_requeue(),
            store_timeout_secs: default_store_timeout(),
        }
    }
}

impl ReconcilerConfig {
    pub fn drift_requeue(&self) -> Duration {
        Duration::from_secs(self.drift_requeue_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

fn default_drift_requeue() -> u64 {
    60
}

fn default_store_timeout() -> u64 {
    30
}
