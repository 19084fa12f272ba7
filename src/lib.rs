//! Amora Core - Matchmaking and verification service for the Amora dating platform
//!
//! This library provides the daily match allocator, compatibility scorer,
//! verification workflow, and entitlement gate behind the platform's API.
//! Allocation is idempotent per user per UTC day; verification decisions
//! are single-winner under concurrent admin review.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    haversine_distance, score_candidate, AllocationResult, Allocator, EntitlementGate, Feature,
    ScoreOutcome, VerificationWorkflow,
};
pub use error::CoreError;
pub use models::{
    AllocatedMatch, MatchRecord, Preference, Profile, ScoringWeights, VerificationStatus,
    WindowKey,
};
pub use services::{CommitOutcome, MemoryStore, ProfileStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Lagos to Abuja is a bit over 500km
        let d = haversine_distance(6.5244, 3.3792, 9.0765, 7.3986);
        assert!(d > 400.0 && d < 700.0);
    }
}
