//! Record store seam
//!
//! The reconciler only needs keyed get/create/update against detectors and
//! workloads. [`InMemoryStore`] implements the traits for development and
//! tests and additionally publishes a change feed.

mod memory;
mod traits;

pub use memory::InMemoryStore;
pub use traits::{
    ChangeKind, DetectorStore, RecordKind, RecordStore, StoreEvent, StoreResult, WorkloadStore,
};
