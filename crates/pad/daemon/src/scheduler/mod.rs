//! Reconciliation scheduling
//!
//! The [`Dispatcher`] turns store change notifications into reconciliation
//! passes and acts on each pass's [`Action`](pad_controller::Action).

mod backoff;
mod dispatcher;
mod queue;

pub use backoff::backoff_delay;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use queue::WorkQueue;
