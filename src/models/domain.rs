use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum age allowed on the platform. Enforced at the store boundary;
/// profiles below this never enter the system.
pub const PLATFORM_MIN_AGE: u8 = 18;

/// Verification state of a profile. Transitions happen only through the
/// verification workflow, never by direct writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationStatus::Verified | VerificationStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a match record. `Pending` at allocation; terminal after both
/// sides respond (or one declines). Never deleted, only status-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Matched,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Matched => "matched",
            MatchStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Lifestyle attributes a profile can carry. Preferences declare these as
/// deal-breakers; a deal-breaker present on a candidate excludes it outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifestyleFlag {
    Smoker,
    Drinker,
    HasChildren,
    WantsChildren,
}

/// Personality archetype tag. The pairwise affinity table lives in
/// `core::archetype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Adventurer,
    Nurturer,
    Achiever,
    FreeSpirit,
    Traditionalist,
    Intellectual,
}

impl Archetype {
    pub const ALL: [Archetype; 6] = [
        Archetype::Adventurer,
        Archetype::Nurturer,
        Archetype::Achiever,
        Archetype::FreeSpirit,
        Archetype::Traditionalist,
        Archetype::Intellectual,
    ];
}

/// Canonical user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub age: u8,
    pub gender: Gender,
    /// Free-text location; coordinates are present only when geocoding
    /// resolved them.
    pub state: String,
    pub lga: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub tribe: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub complexion: Option<String>,
    #[serde(default)]
    pub lifestyle: Vec<LifestyleFlag>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(rename = "partnerValues", default)]
    pub partner_values: Vec<String>,
    #[serde(default)]
    pub archetype: Option<Archetype>,
    #[serde(rename = "verificationStatus")]
    pub verification_status: VerificationStatus,
    #[serde(rename = "verificationSubmittedAt")]
    pub verification_submitted_at: DateTime<Utc>,
    #[serde(rename = "reviewedBy", default)]
    pub reviewed_by: Option<Uuid>,
    #[serde(rename = "reviewedAt", default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(rename = "isPremium", default)]
    pub is_premium: bool,
    #[serde(rename = "photoRefs", default)]
    pub photo_refs: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    /// Coordinates, when geocoding resolved the free-text location.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Matching preferences, one record per user. An empty preferred-value set
/// means no constraint on that dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "minAge")]
    pub min_age: u8,
    #[serde(rename = "maxAge")]
    pub max_age: u8,
    #[serde(rename = "maxDistanceKm", default)]
    pub max_distance_km: Option<u16>,
    #[serde(rename = "preferredEducation", default)]
    pub preferred_education: Vec<String>,
    #[serde(rename = "preferredReligion", default)]
    pub preferred_religion: Vec<String>,
    #[serde(rename = "preferredTribe", default)]
    pub preferred_tribe: Vec<String>,
    #[serde(rename = "preferredComplexion", default)]
    pub preferred_complexion: Vec<String>,
    #[serde(rename = "dealBreakers", default)]
    pub deal_breakers: Vec<LifestyleFlag>,
}

impl Preference {
    /// Unconstrained preferences: full adult age band, no distance bound,
    /// no dimension sets, no deal-breakers.
    pub fn unconstrained(user_id: Uuid) -> Self {
        Self {
            user_id,
            min_age: PLATFORM_MIN_AGE,
            max_age: u8::MAX,
            max_distance_km: None,
            preferred_education: Vec::new(),
            preferred_religion: Vec::new(),
            preferred_tribe: Vec::new(),
            preferred_complexion: Vec::new(),
            deal_breakers: Vec::new(),
        }
    }
}

/// A stored match between two users. The pair is normalized so that
/// `user_a <= user_b`; at most one record exists per unordered pair. The
/// score is computed once at creation and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "userA")]
    pub user_a: Uuid,
    #[serde(rename = "userB")]
    pub user_b: Uuid,
    pub score: f64,
    pub status: MatchStatus,
    #[serde(rename = "acceptedA", default)]
    pub accepted_a: bool,
    #[serde(rename = "acceptedB", default)]
    pub accepted_b: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Normalize an unordered pair into storage order.
    pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn involves(&self, user: Uuid) -> bool {
        self.user_a == user || self.user_b == user
    }

    pub fn other_side(&self, user: Uuid) -> Option<Uuid> {
        if self.user_a == user {
            Some(self.user_b)
        } else if self.user_b == user {
            Some(self.user_a)
        } else {
            None
        }
    }
}

/// A user's answer to an allocated match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResponse {
    Accept,
    Decline,
}

/// Admin decision on a pending verification submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationDecision {
    Approve,
    Reject,
}

/// Key of an allocation window: one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowKey(pub String);

impl WindowKey {
    /// The window containing `at`, formatted `YYYY-MM-DD` in UTC.
    pub fn for_day(at: DateTime<Utc>) -> Self {
        WindowKey(at.date_naive().format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a committed allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedMatch {
    #[serde(rename = "candidateId")]
    pub candidate_id: Uuid,
    pub score: f64,
}

/// The committed allocation for (user, window).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "windowKey")]
    pub window_key: WindowKey,
    pub entries: Vec<AllocatedMatch>,
    #[serde(rename = "committedAt")]
    pub committed_at: DateTime<Utc>,
}

/// Filter the store applies when fetching the candidate pool. Only verified
/// profiles are ever returned, the requester is excluded, and so is anyone
/// already paired with them; those invariants belong to the store, not the
/// caller. The full eligible pool comes back so ranking sees every candidate.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub requester_id: Uuid,
    pub min_age: u8,
    pub max_age: u8,
}

/// Event emitted towards the notification adapter. Delivery is external and
/// best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMatch,
    VerificationApproved,
    VerificationRejected,
    DailyMatchesReady,
}

/// Soft-scoring weights. Named constants so the scorer stays auditable;
/// overridable from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    /// Shared-interest overlap ratio contribution.
    pub interests: f64,
    /// Shared partner-value overlap ratio contribution.
    pub partner_values: f64,
    /// Archetype-pair affinity contribution.
    pub archetype: f64,
    /// Fixed contribution per satisfied advanced dimension the requester
    /// expressed a preference on (education, religion, tribe, complexion).
    pub preferred_dimension: f64,
}

pub const DEFAULT_INTERESTS_WEIGHT: f64 = 30.0;
pub const DEFAULT_PARTNER_VALUES_WEIGHT: f64 = 25.0;
pub const DEFAULT_ARCHETYPE_WEIGHT: f64 = 25.0;
pub const DEFAULT_PREFERRED_DIMENSION_WEIGHT: f64 = 5.0;

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            interests: DEFAULT_INTERESTS_WEIGHT,
            partner_values: DEFAULT_PARTNER_VALUES_WEIGHT,
            archetype: DEFAULT_ARCHETYPE_WEIGHT,
            preferred_dimension: DEFAULT_PREFERRED_DIMENSION_WEIGHT,
        }
    }
}

impl ScoringWeights {
    /// Maximum attainable soft score given these weights. Used for clamping
    /// and to sanity-check configuration.
    pub fn max_score(&self) -> f64 {
        self.interests + self.partner_values + self.archetype + self.preferred_dimension * 4.0
    }
}
