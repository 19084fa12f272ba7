use crate::models::{Preference, Profile};
use serde::{Deserialize, Serialize};

/// Default daily match quota for free accounts.
pub const DEFAULT_FREE_DAILY_QUOTA: u32 = 3;
/// Default daily match quota for premium accounts.
pub const DEFAULT_PREMIUM_DAILY_QUOTA: u32 = 10;

/// Advanced filter dimensions unlocked by premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDimension {
    Education,
    Religion,
    Tribe,
    Complexion,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 4] = [
        FilterDimension::Education,
        FilterDimension::Religion,
        FilterDimension::Tribe,
        FilterDimension::Complexion,
    ];
}

/// Gated features. `daily_quota` is special-cased: every tier has one, but
/// the size differs; the boolean answer reports whether the elevated quota
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AdvancedFilter(FilterDimension),
    DailyQuota,
    SeeLikers,
    ReadReceipts,
}

impl Feature {
    /// Parse the wire form used by the HTTP surface, e.g.
    /// `advanced_filter:religion`, `see_likers`.
    pub fn parse(raw: &str) -> Option<Feature> {
        match raw {
            "daily_quota" => Some(Feature::DailyQuota),
            "see_likers" => Some(Feature::SeeLikers),
            "read_receipts" => Some(Feature::ReadReceipts),
            _ => {
                let dim = raw.strip_prefix("advanced_filter:")?;
                let dim = match dim {
                    "education" => FilterDimension::Education,
                    "religion" => FilterDimension::Religion,
                    "tribe" => FilterDimension::Tribe,
                    "complexion" => FilterDimension::Complexion,
                    _ => return None,
                };
                Some(Feature::AdvancedFilter(dim))
            }
        }
    }
}

/// Static capability table over the premium flag. Pure lookups, no side
/// effects; consulted by both the HTTP surface and the allocator so that
/// entitlement cannot be bypassed by crafted requests.
#[derive(Debug, Clone, Copy)]
pub struct EntitlementGate {
    free_daily_quota: u32,
    premium_daily_quota: u32,
}

impl EntitlementGate {
    pub fn new(free_daily_quota: u32, premium_daily_quota: u32) -> Self {
        Self {
            free_daily_quota,
            premium_daily_quota,
        }
    }

    /// Whether the profile's tier unlocks the feature. Premium unlocks every
    /// gated feature; free unlocks none of them.
    pub fn permits(&self, profile: &Profile, feature: Feature) -> bool {
        match feature {
            Feature::AdvancedFilter(_) | Feature::SeeLikers | Feature::ReadReceipts => {
                profile.is_premium
            }
            Feature::DailyQuota => profile.is_premium,
        }
    }

    /// Daily allocation quota for the profile's tier.
    pub fn daily_quota(&self, profile: &Profile) -> u32 {
        if profile.is_premium {
            self.premium_daily_quota
        } else {
            self.free_daily_quota
        }
    }

    /// Strip advanced-filter dimensions the requester is not entitled to.
    /// The allocator applies this to whatever preferences it loads, so a
    /// caller handing in elevated filters gains nothing.
    pub fn effective_preferences(&self, profile: &Profile, prefs: &Preference) -> Preference {
        let mut effective = prefs.clone();
        for dim in FilterDimension::ALL {
            if !self.permits(profile, Feature::AdvancedFilter(dim)) {
                match dim {
                    FilterDimension::Education => effective.preferred_education.clear(),
                    FilterDimension::Religion => effective.preferred_religion.clear(),
                    FilterDimension::Tribe => effective.preferred_tribe.clear(),
                    FilterDimension::Complexion => effective.preferred_complexion.clear(),
                }
            }
        }
        effective
    }
}

impl Default for EntitlementGate {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_DAILY_QUOTA, DEFAULT_PREMIUM_DAILY_QUOTA)
    }
}
