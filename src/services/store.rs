use crate::error::CoreError;
use crate::models::{
    AllocatedMatch, Allocation, CandidateFilter, MatchRecord, MatchResponse, Preference, Profile,
    VerificationStatus, WindowKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors from the storage layer. Core components translate these into the
/// `CoreError` taxonomy before anything reaches the presentation layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(m) => CoreError::NotEligible(m),
            StoreError::Database(m) | StoreError::Conflict(m) => CoreError::StoreUnavailable(m),
            StoreError::InvalidRecord(m) => CoreError::InvariantViolation(m),
        }
    }
}

/// Outcome of an allocation commit attempt.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// This call won the window; the allocation was persisted.
    Committed(Allocation),
    /// Another call already committed for this (user, window); the existing
    /// set is returned unchanged.
    AlreadyExists(Allocation),
}

/// The single shared mutable resource of the system. All mutation goes
/// through narrow atomic operations; nothing here holds a lock across a
/// scoring pass.
///
/// Implementations: `PostgresStore` (production) and `MemoryStore` (tests
/// and local development).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<Profile, StoreError>;

    /// A user with no stored preference record matches unconstrained.
    async fn get_preferences(&self, user_id: Uuid) -> Result<Option<Preference>, StoreError>;

    /// Fetch the candidate pool. The store enforces the trust invariant
    /// itself: only `verified` profiles are ever returned, the requester is
    /// excluded, and so is anyone already sharing a match record with the
    /// requester (pending, matched or rejected).
    async fn query_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Profile>, StoreError>;

    /// Compare-and-set verification transition. Returns `true` when the
    /// status moved from `expected` to `new` in this call; `false` when the
    /// current status no longer matches `expected`.
    async fn cas_update_verification_status(
        &self,
        user_id: Uuid,
        expected: VerificationStatus,
        new: VerificationStatus,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Atomically commit an allocation for (user, window) and create the
    /// pending match records for its entries. Exactly one commit wins per
    /// window; losers observe `AlreadyExists` with the winner's set.
    async fn cas_commit_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
        entries: &[AllocatedMatch],
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome, StoreError>;

    async fn get_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
    ) -> Result<Option<Allocation>, StoreError>;

    /// Pending verification submissions, oldest first by submission
    /// timestamp. The ordering is a fairness contract.
    async fn pending_verifications(&self) -> Result<Vec<Profile>, StoreError>;

    /// Reset a rejected profile to pending with a fresh submission
    /// timestamp, clearing reviewer metadata. Returns `false` when the
    /// profile is not currently rejected.
    async fn reopen_verification(&self, user_id: Uuid, at: DateTime<Utc>)
        -> Result<bool, StoreError>;

    async fn get_match(&self, a: Uuid, b: Uuid) -> Result<Option<MatchRecord>, StoreError>;

    /// Atomically record one side's response to a pending match. Both sides
    /// accepting transitions the record to `matched`; a decline transitions
    /// it to `rejected`. Responses against a terminal record are a
    /// `Conflict`. The score is never touched.
    async fn record_match_response(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        response: MatchResponse,
        at: DateTime<Utc>,
    ) -> Result<MatchRecord, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
