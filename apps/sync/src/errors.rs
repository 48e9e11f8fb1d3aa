use thiserror::Error;

use crate::actuator::ActuationError;

/// Run-level error type. Validation and enrichment failures never appear
/// here — they are contained per record inside the reconciler.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Pre-flight: missing or rejected credentials. No record is touched.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Pre-flight: the tracker file does not match the expected shape.
    #[error("unexpected tracker file: {0}")]
    DataFormat(String),

    /// Mid-pass: the remote session failed to reach the expected state.
    /// Never retried; the run aborts with earlier mutations intact.
    #[error("remote actuation failed: {0}")]
    Actuation(#[from] ActuationError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
