use crate::core::archetype::affinity_opt;
use crate::core::filters::{hard_exclusion, satisfies_dimension, ExclusionReason};
use crate::models::{Preference, Profile, ScoringWeights};

/// Result of scoring one candidate against a requester.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreOutcome {
    /// A hard filter removed the candidate; soft inputs were never consulted.
    Excluded(ExclusionReason),
    /// Compatibility score, 0 to 100.
    Scored(f64),
}

impl ScoreOutcome {
    pub fn score(&self) -> Option<f64> {
        match self {
            ScoreOutcome::Scored(s) => Some(*s),
            ScoreOutcome::Excluded(_) => None,
        }
    }
}

/// Score a candidate for a requester. Pure: no I/O, no clock, identical
/// inputs always produce identical output.
///
/// Hard filters run first and short-circuit. Survivors get a weighted sum:
/// interest overlap, partner-value overlap, archetype-pair affinity, and a
/// fixed per-dimension contribution for each advanced dimension the
/// requester expressed a preference on and the candidate satisfies. An
/// unexpressed dimension contributes zero, never a penalty. The raw sum is
/// normalized against the weight ceiling into 0-100.
pub fn score_candidate(
    candidate: &Profile,
    requester: &Profile,
    prefs: &Preference,
    weights: &ScoringWeights,
) -> ScoreOutcome {
    if let Some(reason) = hard_exclusion(candidate, requester, prefs) {
        return ScoreOutcome::Excluded(reason);
    }

    let interests = overlap_ratio(&requester.interests, &candidate.interests);
    let partner_values = overlap_ratio(&requester.partner_values, &candidate.partner_values);
    let archetype = affinity_opt(requester.archetype, candidate.archetype);

    let mut raw = interests * weights.interests
        + partner_values * weights.partner_values
        + archetype * weights.archetype;

    let dims: [(Option<&str>, &[String]); 4] = [
        (candidate.education.as_deref(), &prefs.preferred_education),
        (candidate.religion.as_deref(), &prefs.preferred_religion),
        (candidate.tribe.as_deref(), &prefs.preferred_tribe),
        (candidate.complexion.as_deref(), &prefs.preferred_complexion),
    ];
    for (value, preferred) in dims {
        if !preferred.is_empty() && satisfies_dimension(value, preferred) {
            raw += weights.preferred_dimension;
        }
    }

    let max = weights.max_score();
    let normalized = if max > 0.0 { raw / max * 100.0 } else { 0.0 };

    ScoreOutcome::Scored(normalized.clamp(0.0, 100.0))
}

/// Fraction of the requester's declared set the candidate shares,
/// case-insensitive. An empty requester set contributes nothing.
fn overlap_ratio(requester_set: &[String], candidate_set: &[String]) -> f64 {
    if requester_set.is_empty() {
        return 0.0;
    }

    let shared = requester_set
        .iter()
        .filter(|item| {
            candidate_set
                .iter()
                .any(|other| other.eq_ignore_ascii_case(item))
        })
        .count();

    shared as f64 / requester_set.len() as f64
}
