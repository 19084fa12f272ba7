use crate::models::domain::{AllocatedMatch, MatchStatus, VerificationStatus, WindowKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response for the allocate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateMatchesResponse {
    #[serde(rename = "windowKey")]
    pub window_key: WindowKey,
    pub matches: Vec<AllocatedMatch>,
    pub quota: u32,
    #[serde(rename = "quotaExhausted")]
    pub quota_exhausted: bool,
    #[serde(rename = "fromExisting")]
    pub from_existing: bool,
}

/// Response for the match respond endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondResponse {
    #[serde(rename = "userA")]
    pub user_a: Uuid,
    #[serde(rename = "userB")]
    pub user_b: Uuid,
    pub score: f64,
    pub status: MatchStatus,
}

/// One entry of the admin-facing pending verification queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVerification {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "submittedAt")]
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "photoRefs")]
    pub photo_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVerificationsResponse {
    pub pending: Vec<PendingVerification>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveVerificationResponse {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub status: VerificationStatus,
    #[serde(rename = "decidedBy")]
    pub decided_by: Uuid,
    #[serde(rename = "decidedAt")]
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementResponse {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub feature: String,
    pub permitted: bool,
    #[serde(rename = "dailyQuota")]
    pub daily_quota: u32,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
