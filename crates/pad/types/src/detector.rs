//! Desired-state records
//!
//! An [`AnomalyDetector`] declares one anomaly-detection service: which image
//! to run, how many replicas, and which metrics source it trains against.
//! Omitted spec fields fall back to the published defaults.

use crate::error::ValidationError;
use crate::ids::ObjectKey;
use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE: &str = "quay.io/aicoe/prometheus-anomaly-detector:latest";
pub const DEFAULT_REPLICAS: u32 = 1;
pub const DEFAULT_SOURCE: &str = "http://demo.robustperception.io:9090/";
pub const DEFAULT_METRICS: &str = "up";
pub const DEFAULT_RETRAINING_INTERVAL: &str = "15";
pub const DEFAULT_TRAINING_WINDOW: &str = "24h";

/// Declared desired state for one detector instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetector {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: AnomalyDetectorSpec,
}

impl AnomalyDetector {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: AnomalyDetectorSpec) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec,
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyDetectorSpec {
    /// Container image reference
    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default = "default_replicas")]
    pub replica_count: u32,

    /// Metrics source URL
    #[serde(default = "default_source")]
    pub source_endpoint: String,

    /// Which metrics to watch
    #[serde(default = "default_metrics")]
    pub metric_selector: String,

    /// Minutes between retraining runs, encoded as a string
    #[serde(default = "default_retraining_interval")]
    pub retraining_interval_minutes: String,

    /// Rolling training window, e.g. `24h`
    #[serde(default = "default_training_window")]
    pub training_window_size: String,

    /// Secret holding the metrics source access token. When unset the
    /// workload receives a placeholder token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_secret: Option<SecretKeyRef>,
}

impl Default for AnomalyDetectorSpec {
    fn default() -> Self {
        Self {
            image: default_image(),
            replica_count: default_replicas(),
            source_endpoint: default_source(),
            metric_selector: default_metrics(),
            retraining_interval_minutes: default_retraining_interval(),
            training_window_size: default_training_window(),
            access_token_secret: None,
        }
    }
}

impl AnomalyDetectorSpec {
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replica_count = replicas;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_endpoint = source.into();
        self
    }

    pub fn with_metrics(mut self, metrics: impl Into<String>) -> Self {
        self.metric_selector = metrics.into();
        self
    }

    pub fn with_retraining_interval(mut self, minutes: impl Into<String>) -> Self {
        self.retraining_interval_minutes = minutes.into();
        self
    }

    pub fn with_training_window(mut self, window: impl Into<String>) -> Self {
        self.training_window_size = window.into();
        self
    }

    pub fn with_access_token_secret(mut self, secret: SecretKeyRef) -> Self {
        self.access_token_secret = Some(secret);
        self
    }

    /// Check the spec for values the workload cannot start with
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image.trim().is_empty() {
            return Err(ValidationError::EmptyField("image"));
        }

        if self.metric_selector.trim().is_empty() {
            return Err(ValidationError::EmptyField("metricSelector"));
        }

        if self.retraining_interval_minutes.parse::<u32>().is_err() {
            return Err(ValidationError::InvalidRetrainingInterval(
                self.retraining_interval_minutes.clone(),
            ));
        }

        if !is_window_duration(&self.training_window_size) {
            return Err(ValidationError::InvalidTrainingWindow(
                self.training_window_size.clone(),
            ));
        }

        if let Some(secret) = &self.access_token_secret {
            if secret.name.is_empty() || secret.key.is_empty() {
                return Err(ValidationError::EmptyField("accessTokenSecret"));
            }
        }

        Ok(())
    }

    /// Values the workload starts with but that are unlikely to be intended
    pub fn warnings(&self) -> Vec<ValidationError> {
        let mut warnings = Vec::new();

        if !(self.source_endpoint.starts_with("http://")
            || self.source_endpoint.starts_with("https://"))
        {
            warnings.push(ValidationError::InvalidSourceEndpoint(
                self.source_endpoint.clone(),
            ));
        }

        if self.retraining_interval_minutes.parse::<u32>() == Ok(0) {
            warnings.push(ValidationError::ZeroRetrainingInterval);
        }

        warnings
    }
}

const WINDOW_UNITS: [&str; 7] = ["ms", "s", "m", "h", "d", "w", "y"];

/// One or more `<digits><unit>` groups, e.g. `24h` or `1h30m`, not all zero
fn is_window_duration(value: &str) -> bool {
    let mut rest = value;
    let mut any_nonzero = false;

    while !rest.is_empty() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        let Ok(amount) = rest[..digits].parse::<u64>() else {
            return false;
        };
        any_nonzero |= amount > 0;
        rest = &rest[digits..];

        // "ms" must be tried before "m"
        let Some(unit) = WINDOW_UNITS.iter().find(|unit| rest.starts_with(**unit)) else {
            return false;
        };
        rest = &rest[unit.len()..];
    }

    any_nonzero
}

/// Reference to one key of a secret in the detector's namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

impl SecretKeyRef {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_replicas() -> u32 {
    DEFAULT_REPLICAS
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_metrics() -> String {
    DEFAULT_METRICS.to_string()
}

fn default_retraining_interval() -> String {
    DEFAULT_RETRAINING_INTERVAL.to_string()
}

fn default_training_window() -> String {
    DEFAULT_TRAINING_WINDOW.to_string()
}
