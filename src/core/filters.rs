use crate::core::distance::pair_distance_km;
use crate::core::entitlement::FilterDimension;
use crate::models::{LifestyleFlag, Preference, Profile};
use serde::Serialize;

/// Why a candidate was excluded by a hard filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    AgeOutOfRange,
    DealBreaker(LifestyleFlag),
    TooFar,
    DimensionMismatch(FilterDimension),
}

/// Apply the exclusionary hard filters, in order: age band, deal-breakers,
/// distance. Returns the first reason that fires, or `None` for a survivor.
///
/// Distance only applies when a bound is set and both locations resolve;
/// an unresolvable location neither matches nor blocks, it is logged as a
/// data-quality signal and the dimension is treated as unconstrained.
pub fn hard_exclusion(
    candidate: &Profile,
    requester: &Profile,
    prefs: &Preference,
) -> Option<ExclusionReason> {
    if candidate.age < prefs.min_age || candidate.age > prefs.max_age {
        return Some(ExclusionReason::AgeOutOfRange);
    }

    for flag in &prefs.deal_breakers {
        if candidate.lifestyle.contains(flag) {
            return Some(ExclusionReason::DealBreaker(*flag));
        }
    }

    if let Some(max_km) = prefs.max_distance_km {
        match pair_distance_km(requester.coordinates(), candidate.coordinates()) {
            Some(km) if km > max_km as f64 => return Some(ExclusionReason::TooFar),
            Some(_) => {}
            None => {
                tracing::debug!(
                    candidate = %candidate.id,
                    requester = %requester.id,
                    "distance bound set but location unresolvable, skipping dimension"
                );
            }
        }
    }

    None
}

/// Whether a candidate's attribute satisfies an expressed preferred-value
/// set. An empty set is "no preference" and always satisfies; an expressed
/// set requires the candidate value to be present (case-insensitive, the
/// attributes are free text).
#[inline]
pub fn satisfies_dimension(candidate_value: Option<&str>, preferred: &[String]) -> bool {
    if preferred.is_empty() {
        return true;
    }
    match candidate_value {
        Some(value) => preferred.iter().any(|p| p.eq_ignore_ascii_case(value)),
        None => false,
    }
}

/// First expressed advanced dimension the candidate fails, if any. Only
/// consulted for entitled requesters; free-tier preferences reach the
/// allocator already stripped.
pub fn advanced_mismatch(candidate: &Profile, prefs: &Preference) -> Option<FilterDimension> {
    let dims: [(FilterDimension, Option<&str>, &[String]); 4] = [
        (
            FilterDimension::Education,
            candidate.education.as_deref(),
            &prefs.preferred_education,
        ),
        (
            FilterDimension::Religion,
            candidate.religion.as_deref(),
            &prefs.preferred_religion,
        ),
        (
            FilterDimension::Tribe,
            candidate.tribe.as_deref(),
            &prefs.preferred_tribe,
        ),
        (
            FilterDimension::Complexion,
            candidate.complexion.as_deref(),
            &prefs.preferred_complexion,
        ),
    ];

    for (dim, value, preferred) in dims {
        if !satisfies_dimension(value, preferred) {
            return Some(dim);
        }
    }
    None
}
