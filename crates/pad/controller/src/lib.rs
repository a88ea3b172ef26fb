//! # PAD Controller
//!
//! Keeps each anomaly-detector [`Workload`](pad_types::Workload) converged with
//! the [`AnomalyDetector`](pad_types::AnomalyDetector) that declares it.
//!
//! ## Key Components
//!
//! - [`project`]: fixed-order environment projection of a detector spec
//! - [`diff`]: pure comparator producing a [`MutationPlan`]
//! - [`render_workload`]: full workload built from a detector, used on create
//! - [`Reconciler`]: one reconciliation pass per call, returning an [`Action`]
//! - [`RecordStore`]: store seam, with [`InMemoryStore`] as the reference
//!   implementation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pad_controller::{InMemoryStore, ReconcileContext, Reconciler, ReconcilerConfig};
//! use pad_types::{AnomalyDetector, AnomalyDetectorSpec};
//!
//! # async fn example() {
//! let store = Arc::new(InMemoryStore::new());
//! let detector = AnomalyDetector::new("monitoring", "pad-sample", AnomalyDetectorSpec::default());
//! store.upsert_detector(detector.clone()).await.unwrap();
//!
//! let reconciler = Reconciler::new(store, ReconcilerConfig::default());
//! let action = reconciler
//!     .reconcile(&detector.key(), &ReconcileContext::new())
//!     .await
//!     .unwrap();
//! println!("next: {:?}", action);
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod comparator;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod projection;
pub mod reconciler;
pub mod render;
pub mod store;

pub use comparator::{diff, MutationPlan, WorkloadPatch};
pub use config::ReconcilerConfig;
pub use context::ReconcileContext;
pub use error::{ReconcileError, Result, StoreError, StoreOperation};
pub use events::{ControllerEvent, ControllerEventEnvelope};
pub use projection::{project, EnvironmentSet};
pub use reconciler::{Action, Reconciler};
pub use render::render_workload;
pub use store::{
    ChangeKind, DetectorStore, InMemoryStore, RecordKind, RecordStore, StoreEvent, StoreResult,
    WorkloadStore,
};
