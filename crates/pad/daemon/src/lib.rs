//! PAD Daemon library
//!
//! This module provides the runtime around the reconciler:
//! - Layered configuration
//! - Manifest loading into the record store
//! - Dispatcher with per-key serialization, requeue and backoff
//! - Runtime lifecycle management

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod manifest;
pub mod runtime;
pub mod scheduler;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use runtime::ControllerRuntime;
pub use scheduler::{Dispatcher, DispatcherConfig};
