use crate::models::domain::{MatchResponse, VerificationDecision};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request to allocate the day's matches. No ambient "current user": the
/// requester is always an explicit parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateMatchesRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
}

/// Request to answer an allocated match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(alias = "other_user_id", rename = "otherUserId")]
    pub other_user_id: Uuid,
    pub response: MatchResponse,
}

/// Admin decision on a pending verification submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveVerificationRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    pub decision: VerificationDecision,
    #[serde(alias = "admin_id", rename = "adminId")]
    pub admin_id: Uuid,
}

/// Resubmission after a rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReopenVerificationRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
}

/// Query parameters for the pending verification queue.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PendingVerificationsQuery {
    #[validate(range(min = 1, max = 200))]
    #[serde(default)]
    pub limit: Option<u16>,
}

/// Query parameters for an entitlement check. The feature uses the wire
/// form, e.g. `advanced_filter:religion` or `see_likers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    pub feature: String,
}
