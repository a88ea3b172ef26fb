//! Configuration for pad-daemon

use crate::scheduler::DispatcherConfig;
use pad_controller::ReconcilerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Reconciler configuration
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Dispatcher configuration
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Detector manifests loaded into the store at startup
    #[serde(default)]
    pub manifests: Vec<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `PAD__*`
    /// environment variables (`PAD__DISPATCHER__MAX_CONCURRENT_RECONCILES=8`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PAD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.reconciler, ReconcilerConfig::default());
        assert_eq!(config.dispatcher.max_concurrent_reconciles, 4);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.manifests.is_empty());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.reconciler.drift_requeue_secs, 60);
        assert_eq!(config.dispatcher.backoff_base_ms, 500);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("padd-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("padd.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "reconciler:\n  drift_requeue_secs: 15\ndispatcher:\n  max_concurrent_reconciles: 2\nmanifests:\n  - detectors.yaml"
        )
        .unwrap();

        let config = DaemonConfig::load(path.to_str()).unwrap();

        assert_eq!(config.reconciler.drift_requeue_secs, 15);
        assert_eq!(config.reconciler.store_timeout_secs, 30);
        assert_eq!(config.dispatcher.max_concurrent_reconciles, 2);
        assert_eq!(config.manifests, vec![PathBuf::from("detectors.yaml")]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
