//! Record validation errors

use thiserror::Error;

/// Problems found in a detector spec.
///
/// Returned by `validate` when the workload cannot start, and by `warnings`
/// for values it starts with anyway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field must not be empty: {0}")]
    EmptyField(&'static str),

    #[error("Source endpoint is not an http(s) URL: {0}")]
    InvalidSourceEndpoint(String),

    #[error("Retraining interval must be a whole number of minutes: {0:?}")]
    InvalidRetrainingInterval(String),

    #[error("Retraining interval is zero minutes")]
    ZeroRetrainingInterval,

    #[error("Training window must look like 24h, 30m or 1h30m: {0:?}")]
    InvalidTrainingWindow(String),
}
