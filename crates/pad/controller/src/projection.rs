//! Environment projection
//!
//! The detector image reads its whole configuration from environment
//! variables. [`project`] maps a spec onto exactly seven entries in a fixed
//! order; the comparator relies on that order, so appending, removing or
//! reordering entries changes what every running workload is compared against.

use pad_types::{AnomalyDetectorSpec, EnvVar};

pub const ENV_PROM_URL: &str = "FLT_PROM_URL";
pub const ENV_PROM_ACCESS_TOKEN: &str = "FLT_PROM_ACCESS_TOKEN";
pub const ENV_METRICS_LIST: &str = "FLT_METRICS_LIST";
pub const ENV_RETRAINING_INTERVAL: &str = "FLT_RETRAINING_INTERVAL_MINUTES";
pub const ENV_TRAINING_WINDOW: &str = "FLT_ROLLING_TRAINING_WINDOW_SIZE";
pub const ENV_DEBUG_MODE: &str = "FLT_DEBUG_MODE";
pub const ENV_APP_FILE: &str = "APP_FILE";

/// Token handed to workloads whose detector names no secret. Kept verbatim;
/// set `accessTokenSecret` to supply a real token.
pub const PLACEHOLDER_ACCESS_TOKEN: &str = "my-access-token";

const DEBUG_MODE: &str = "True";
const APP_FILE: &str = "app.py";

/// Ordered environment derived from a detector spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSet(Vec<EnvVar>);

impl EnvironmentSet {
    pub fn as_slice(&self) -> &[EnvVar] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<EnvVar> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ordered comparison: same length and equal entries position by position
    pub fn matches(&self, live: &[EnvVar]) -> bool {
        self.0.len() == live.len()
            && self
                .0
                .iter()
                .zip(live)
                .all(|(want, have)| want.name == have.name && want.value == have.value)
    }
}

/// Project a detector spec onto the workload environment
pub fn project(spec: &AnomalyDetectorSpec) -> EnvironmentSet {
    let access_token = match &spec.access_token_secret {
        Some(secret) => EnvVar::from_secret(ENV_PROM_ACCESS_TOKEN, secret.clone()),
        None => EnvVar::literal(ENV_PROM_ACCESS_TOKEN, PLACEHOLDER_ACCESS_TOKEN),
    };

    EnvironmentSet(vec![
        EnvVar::literal(ENV_PROM_URL, spec.source_endpoint.clone()),
        access_token,
        EnvVar::literal(ENV_METRICS_LIST, spec.metric_selector.clone()),
        EnvVar::literal(ENV_RETRAINING_INTERVAL, spec.retraining_interval_minutes.clone()),
        EnvVar::literal(ENV_TRAINING_WINDOW, spec.training_window_size.clone()),
        EnvVar::literal(ENV_DEBUG_MODE, DEBUG_MODE),
        EnvVar::literal(ENV_APP_FILE, APP_FILE),
    ])
}
