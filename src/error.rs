//! Pipeline-wide error type.

use thiserror::Error;

/// The closed set of failure kinds `optimize_route` and its stages can
/// surface. Provider failures never reach this type directly — they degrade
/// to a Haversine fallback or a mode downgrade inside the stage that made
/// the call (see `services::retry`).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("routing provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("daily limit exceeded for {unassigned_count} place(s)")]
    DailyLimitExceeded { unassigned_count: usize },

    #[error("optimization cancelled")]
    Cancelled,
}

pub type PipelineResult<T> = Result<T, PipelineError>;
