//! # PAD Types
//!
//! Record types shared by the anomaly-detector controller:
//!
//! - [`AnomalyDetector`]: the declared desired state for one detector instance
//! - [`Workload`]: the live replica set realizing a detector
//! - [`ObjectKey`], [`ObjectMeta`], [`OwnerReference`]: identity and metadata
//!   common to every stored record

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod detector;
pub mod error;
pub mod ids;
pub mod meta;
pub mod workload;

pub use detector::{AnomalyDetector, AnomalyDetectorSpec, SecretKeyRef};
pub use error::ValidationError;
pub use ids::{ObjectKey, Uid};
pub use meta::{ObjectMeta, OwnerReference};
pub use workload::{Container, ContainerPort, EnvValue, EnvVar, Workload, WorkloadSpec};

/// Kind name of desired-state records
pub const DETECTOR_KIND: &str = "AnomalyDetector";

/// Kind name of live workload records
pub const WORKLOAD_KIND: &str = "Workload";
