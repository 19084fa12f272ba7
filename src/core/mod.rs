// Core decision logic exports
pub mod allocator;
pub mod archetype;
pub mod distance;
pub mod entitlement;
pub mod filters;
pub mod scoring;
pub mod workflow;

pub use allocator::{AllocationResult, Allocator};
pub use archetype::affinity;
pub use distance::haversine_distance;
pub use entitlement::{EntitlementGate, Feature, FilterDimension};
pub use filters::{advanced_mismatch, hard_exclusion, ExclusionReason};
pub use scoring::{score_candidate, ScoreOutcome};
pub use workflow::{Resolution, VerificationWorkflow};
