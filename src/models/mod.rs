// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AllocatedMatch, Allocation, Archetype, CandidateFilter, Gender, LifestyleFlag, MatchRecord,
    MatchResponse, MatchStatus, NotificationEvent, NotificationKind, Preference, Profile,
    ScoringWeights, VerificationDecision, VerificationStatus, WindowKey, PLATFORM_MIN_AGE,
};
pub use requests::{
    AllocateMatchesRequest, EntitlementQuery, PendingVerificationsQuery,
    ReopenVerificationRequest, ResolveVerificationRequest, RespondRequest,
};
pub use responses::{
    AllocateMatchesResponse, EntitlementResponse, ErrorResponse, HealthResponse,
    PendingVerification, PendingVerificationsResponse, ResolveVerificationResponse,
    RespondResponse,
};
