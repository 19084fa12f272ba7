use crate::models::VerificationStatus;
use thiserror::Error;

/// Errors surfaced by the decision core. The presentation layer receives one
/// of these kinds, never a raw store failure. Quota exhaustion is not an
/// error; it is reported as a flag on the allocation result.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requester is not verified, or the feature is not entitled.
    #[error("not eligible: {0}")]
    NotEligible(String),

    /// A verification decision addressed a record that is already terminal.
    #[error("verification already resolved as {current}")]
    AlreadyResolved { current: VerificationStatus },

    /// Transient store failure; the caller may retry with backoff.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A data invariant was found broken (e.g. duplicate match pair).
    /// Fatal to the operation; existing records are left untouched.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl CoreError {
    /// Stable machine-readable kind for API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotEligible(_) => "not_eligible",
            CoreError::AlreadyResolved { .. } => "already_resolved",
            CoreError::StoreUnavailable(_) => "store_unavailable",
            CoreError::InvariantViolation(_) => "invariant_violation",
        }
    }
}
