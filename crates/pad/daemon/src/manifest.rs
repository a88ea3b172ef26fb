//! Detector manifests
//!
//! A manifest is a YAML sequence of detectors:
//!
//! ```yaml
//! - name: pad-sample
//!   namespace: monitoring
//!   spec:
//!     image: quay.io/aicoe/prometheus-anomaly-detector:latest
//!     replicaCount: 2
//!     metricSelector: "up"
//! ```
//!
//! `namespace` defaults to `default`; omitted spec fields take their usual
//! defaults.

use crate::error::{DaemonError, DaemonResult};
use pad_types::{AnomalyDetector, AnomalyDetectorSpec};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    name: String,
    #[serde(default = "default_namespace")]
    namespace: String,
    #[serde(default)]
    spec: AnomalyDetectorSpec,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Parse the detectors declared in one manifest document
pub fn parse_manifest(path: &Path, contents: &str) -> DaemonResult<Vec<AnomalyDetector>> {
    let entries: Vec<ManifestEntry> =
        serde_yaml::from_str(contents).map_err(|e| DaemonError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    entries
        .into_iter()
        .map(|entry| {
            if entry.name.trim().is_empty() {
                return Err(DaemonError::Manifest {
                    path: path.to_path_buf(),
                    reason: "detector name must not be empty".to_string(),
                });
            }
            Ok(AnomalyDetector::new(entry.namespace, entry.name, entry.spec))
        })
        .collect()
}

/// Read and parse every manifest, in order
pub fn load_manifests(paths: &[PathBuf]) -> DaemonResult<Vec<AnomalyDetector>> {
    let mut detectors = Vec::new();
    for path in paths {
        let contents = std::fs::read_to_string(path).map_err(|e| DaemonError::Manifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let parsed = parse_manifest(path, &contents)?;
        tracing::debug!(path = %path.display(), count = parsed.len(), "Parsed manifest");
        detectors.extend(parsed);
    }
    Ok(detectors)
}
