use crate::core::entitlement::EntitlementGate;
use crate::core::filters::advanced_mismatch;
use crate::core::scoring::{score_candidate, ScoreOutcome};
use crate::error::CoreError;
use crate::models::{
    AllocatedMatch, CandidateFilter, MatchRecord, MatchResponse, MatchStatus, Preference,
    ScoringWeights, WindowKey,
};
use crate::services::notify::{daily_matches_event, emit_best_effort, new_match_event, NotificationSink};
use crate::services::store::{CommitOutcome, ProfileStore, StoreError};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result of a daily allocation call.
#[derive(Debug, Clone)]
pub struct AllocationResult {
    pub window_key: WindowKey,
    pub entries: Vec<AllocatedMatch>,
    pub quota: u32,
    /// The window already holds its full quota; informational, not an error.
    pub quota_exhausted: bool,
    /// The set was served from an earlier commit in the same window.
    pub from_existing: bool,
}

/// Daily match allocator.
///
/// Allocation is idempotent per (user, window): the first call in a window
/// computes and commits the set, every later call returns it unchanged.
/// Concurrent calls are serialized by the store's conditional commit, so
/// quota is charged at most once per window.
#[derive(Debug, Clone)]
pub struct Allocator {
    weights: ScoringWeights,
    gate: EntitlementGate,
}

impl Allocator {
    pub fn new(weights: ScoringWeights, gate: EntitlementGate) -> Self {
        Self { weights, gate }
    }

    /// Allocate the day's matches for a requester.
    ///
    /// A pool smaller than the quota yields partial fulfillment. An
    /// unverified requester gets `NotEligible`, never a crash.
    pub async fn allocate_daily<S, N>(
        &self,
        store: &S,
        sink: &N,
        requester_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AllocationResult, CoreError>
    where
        S: ProfileStore + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let requester = store.get_profile(requester_id).await?;

        if !requester.is_verified() {
            return Err(CoreError::NotEligible(format!(
                "requester {} is not verified",
                requester_id
            )));
        }

        let quota = self.gate.daily_quota(&requester);
        let window = WindowKey::for_day(now);

        // Idempotence: a committed window is returned as-is, quota is never
        // re-charged.
        if let Some(existing) = store.get_allocation(requester_id, &window).await? {
            return Ok(self.existing_result(existing.entries, window, quota));
        }

        let prefs = store
            .get_preferences(requester_id)
            .await?
            .unwrap_or_else(|| Preference::unconstrained(requester_id));

        // Advanced dimensions act as hard filters only when entitled; the
        // stripped copy is authoritative no matter what the caller sent.
        let effective = self.gate.effective_preferences(&requester, &prefs);

        // The whole eligible pool is scored; truncation to quota happens
        // only after ranking, so a high scorer is never lost to a prefetch
        // cutoff.
        let pool = store
            .query_candidates(&CandidateFilter {
                requester_id,
                min_age: effective.min_age,
                max_age: effective.max_age,
            })
            .await?;

        tracing::debug!(
            requester = %requester_id,
            pool = pool.len(),
            window = %window,
            "scoring candidate pool"
        );

        let mut scored: Vec<AllocatedMatch> = pool
            .into_iter()
            .filter(|candidate| advanced_mismatch(candidate, &effective).is_none())
            .filter_map(|candidate| {
                match score_candidate(&candidate, &requester, &prefs, &self.weights) {
                    ScoreOutcome::Scored(score) => Some(AllocatedMatch {
                        candidate_id: candidate.id,
                        score,
                    }),
                    ScoreOutcome::Excluded(_) => None,
                }
            })
            .collect();

        // Score descending, candidate id ascending: deterministic and
        // reproducible ranking.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        scored.truncate(quota as usize);

        match store
            .cas_commit_allocation(requester_id, &window, &scored, now)
            .await
        {
            Ok(CommitOutcome::Committed(allocation)) => {
                if !allocation.entries.is_empty() {
                    emit_best_effort(
                        sink,
                        daily_matches_event(requester_id, allocation.entries.len()),
                    )
                    .await;
                }
                Ok(AllocationResult {
                    quota_exhausted: allocation.entries.len() >= quota as usize,
                    window_key: window,
                    entries: allocation.entries,
                    quota,
                    from_existing: false,
                })
            }
            Ok(CommitOutcome::AlreadyExists(existing)) => {
                // Lost the window to a concurrent call; its set stands.
                Ok(self.existing_result(existing.entries, window, quota))
            }
            Err(StoreError::InvalidRecord(m)) => Err(CoreError::InvariantViolation(m)),
            Err(_) => {
                // One fresh read; a concurrent winner may have committed.
                match store.get_allocation(requester_id, &window).await? {
                    Some(existing) => Ok(self.existing_result(existing.entries, window, quota)),
                    None => Err(CoreError::StoreUnavailable(
                        "allocation commit failed and no committed set found".into(),
                    )),
                }
            }
        }
    }

    /// Record one side's answer to an allocated match. Mutual accept makes
    /// the pair `matched` and notifies both sides; a decline makes it
    /// `rejected`. Answers against an already-terminal record are a no-op
    /// returning the current state.
    pub async fn respond<S, N>(
        &self,
        store: &S,
        sink: &N,
        user_id: Uuid,
        other_id: Uuid,
        response: MatchResponse,
        now: DateTime<Utc>,
    ) -> Result<MatchRecord, CoreError>
    where
        S: ProfileStore + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let record = match store
            .record_match_response(user_id, other_id, response, now)
            .await
        {
            Ok(record) => record,
            Err(StoreError::Conflict(_)) => {
                // Already terminal; report the standing state.
                return store
                    .get_match(user_id, other_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::InvariantViolation(format!(
                            "match ({}, {}) vanished after conflict",
                            user_id, other_id
                        ))
                    });
            }
            Err(e) => return Err(e.into()),
        };

        if record.status == MatchStatus::Matched {
            emit_best_effort(sink, new_match_event(record.user_a, record.user_b, record.score))
                .await;
            emit_best_effort(sink, new_match_event(record.user_b, record.user_a, record.score))
                .await;
        }

        Ok(record)
    }

    fn existing_result(
        &self,
        entries: Vec<AllocatedMatch>,
        window: WindowKey,
        quota: u32,
    ) -> AllocationResult {
        AllocationResult {
            quota_exhausted: entries.len() >= quota as usize,
            window_key: window,
            entries,
            quota,
            from_existing: true,
        }
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(ScoringWeights::default(), EntitlementGate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Gender, LifestyleFlag, Profile, VerificationStatus,
    };
    use crate::services::memory::MemoryStore;
    use crate::services::notify::LogNotifier;
    use std::sync::Arc;

    fn profile(age: u8, status: VerificationStatus) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            display_name: format!("User {}", age),
            age,
            gender: Gender::Female,
            state: "Lagos".to_string(),
            lga: "Ikeja".to_string(),
            latitude: None,
            longitude: None,
            religion: Some("christian".to_string()),
            tribe: Some("yoruba".to_string()),
            education: Some("bsc".to_string()),
            complexion: None,
            lifestyle: vec![],
            bio: None,
            interests: vec!["music".to_string()],
            partner_values: vec!["honesty".to_string()],
            archetype: None,
            verification_status: status,
            verification_submitted_at: now,
            reviewed_by: None,
            reviewed_at: None,
            is_premium: false,
            photo_refs: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn verified(age: u8) -> Profile {
        profile(age, VerificationStatus::Verified)
    }

    #[tokio::test]
    async fn test_unverified_requester_is_not_eligible() {
        let store = MemoryStore::new();
        let requester = profile(30, VerificationStatus::Pending);
        store.insert_profile(requester.clone()).unwrap();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await;

        assert!(matches!(result, Err(CoreError::NotEligible(_))));
    }

    #[tokio::test]
    async fn test_hard_filters_shape_the_allocation() {
        // Requester 30, range [25,35], smoker deal-breaker. Pool: A ok,
        // B too old, C smokes. Only A is allocated.
        let store = MemoryStore::new();
        let requester = verified(30);
        let a = verified(28);
        let b = verified(40);
        let mut c = verified(27);
        c.lifestyle.push(LifestyleFlag::Smoker);

        store.insert_profile(requester.clone()).unwrap();
        store.insert_profile(a.clone()).unwrap();
        store.insert_profile(b.clone()).unwrap();
        store.insert_profile(c.clone()).unwrap();
        store
            .insert_preferences(Preference {
                min_age: 25,
                max_age: 35,
                deal_breakers: vec![LifestyleFlag::Smoker],
                ..Preference::unconstrained(requester.id)
            })
            .unwrap();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].candidate_id, a.id);
        assert!(!result.from_existing);
    }

    #[tokio::test]
    async fn test_free_quota_and_tie_break_by_ascending_id() {
        // Five equally-scored verified candidates, free quota 3: exactly the
        // three lowest ids are allocated, in order.
        let store = MemoryStore::new();
        let requester = verified(30);
        store.insert_profile(requester.clone()).unwrap();

        let mut ids: Vec<Uuid> = Vec::new();
        for _ in 0..5 {
            let candidate = verified(28);
            ids.push(candidate.id);
            store.insert_profile(candidate).unwrap();
        }
        ids.sort();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(result.quota, 3);
        assert_eq!(result.entries.len(), 3);
        let allocated: Vec<Uuid> = result.entries.iter().map(|e| e.candidate_id).collect();
        assert_eq!(allocated, ids[..3].to_vec());
        assert!(result.quota_exhausted);
    }

    #[tokio::test]
    async fn test_ranking_sees_the_whole_eligible_pool() {
        // 21 eligible candidates, free quota 3. The only one sharing the
        // requester's interests carries the highest id; it must still win
        // a slot over the zero-scoring crowd.
        let store = MemoryStore::new();
        let requester = verified(30);
        store.insert_profile(requester.clone()).unwrap();

        for i in 1..=20u128 {
            let mut low = verified(28);
            low.id = Uuid::from_u128(i);
            low.interests = vec![];
            low.partner_values = vec![];
            store.insert_profile(low).unwrap();
        }
        let mut best = verified(28);
        best.id = Uuid::from_u128(999);
        store.insert_profile(best.clone()).unwrap();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(result.entries.len(), 3);
        assert_eq!(result.entries[0].candidate_id, best.id);
    }

    #[tokio::test]
    async fn test_repeated_calls_return_identical_set() {
        let store = MemoryStore::new();
        let requester = verified(30);
        store.insert_profile(requester.clone()).unwrap();
        for _ in 0..5 {
            store.insert_profile(verified(28)).unwrap();
        }

        let allocator = Allocator::default();
        let now = Utc::now();
        let first = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, now)
            .await
            .unwrap();
        let second = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, now)
            .await
            .unwrap();

        assert_eq!(first.entries, second.entries);
        assert!(second.from_existing);
        // The follow-up call created no further match records
        assert_eq!(store.match_count(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_observe_one_committed_set() {
        let store = Arc::new(MemoryStore::new());
        let requester = verified(30);
        store.insert_profile(requester.clone()).unwrap();
        for _ in 0..8 {
            store.insert_profile(verified(28)).unwrap();
        }

        let allocator = Allocator::default();
        let now = Utc::now();

        let (r1, r2, r3) = tokio::join!(
            allocator.allocate_daily(store.as_ref(), &LogNotifier, requester.id, now),
            allocator.allocate_daily(store.as_ref(), &LogNotifier, requester.id, now),
            allocator.allocate_daily(store.as_ref(), &LogNotifier, requester.id, now),
        );
        let (r1, r2, r3) = (r1.unwrap(), r2.unwrap(), r3.unwrap());

        assert_eq!(r1.entries, r2.entries);
        assert_eq!(r2.entries, r3.entries);
        // Quota charged once: exactly quota-many match records exist
        assert_eq!(store.match_count(), 3);
    }

    #[tokio::test]
    async fn test_partial_fulfillment_when_pool_is_small() {
        let store = MemoryStore::new();
        let requester = verified(30);
        let only = verified(28);
        store.insert_profile(requester.clone()).unwrap();
        store.insert_profile(only.clone()).unwrap();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(result.entries.len(), 1);
        assert!(!result.quota_exhausted);
    }

    #[tokio::test]
    async fn test_free_tier_advanced_filters_are_stripped() {
        // A free requester sending a religion filter must still see
        // candidates of other religions; the dimension only shapes the
        // soft score.
        let store = MemoryStore::new();
        let requester = verified(30);
        let mut muslim = verified(28);
        muslim.religion = Some("muslim".to_string());

        store.insert_profile(requester.clone()).unwrap();
        store.insert_profile(muslim.clone()).unwrap();
        store
            .insert_preferences(Preference {
                preferred_religion: vec!["christian".to_string()],
                ..Preference::unconstrained(requester.id)
            })
            .unwrap();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].candidate_id, muslim.id);
    }

    #[tokio::test]
    async fn test_premium_advanced_filters_are_hard() {
        let store = MemoryStore::new();
        let mut requester = verified(30);
        requester.is_premium = true;
        let mut muslim = verified(28);
        muslim.religion = Some("muslim".to_string());
        let christian = verified(29);

        store.insert_profile(requester.clone()).unwrap();
        store.insert_profile(muslim.clone()).unwrap();
        store.insert_profile(christian.clone()).unwrap();
        store
            .insert_preferences(Preference {
                preferred_religion: vec!["christian".to_string()],
                ..Preference::unconstrained(requester.id)
            })
            .unwrap();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await
            .unwrap();

        let allocated: Vec<Uuid> = result.entries.iter().map(|e| e.candidate_id).collect();
        assert!(allocated.contains(&christian.id));
        assert!(!allocated.contains(&muslim.id));
    }

    #[tokio::test]
    async fn test_next_window_allocates_fresh_candidates() {
        let store = MemoryStore::new();
        let requester = verified(30);
        store.insert_profile(requester.clone()).unwrap();
        for _ in 0..8 {
            store.insert_profile(verified(28)).unwrap();
        }

        let allocator = Allocator::default();
        let today = Utc::now();
        let tomorrow = today + chrono::Duration::days(1);

        let first = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, today)
            .await
            .unwrap();
        let second = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, tomorrow)
            .await
            .unwrap();

        assert_ne!(first.window_key, second.window_key);
        // Yesterday's candidates are pair-excluded, never re-surfaced
        for entry in &first.entries {
            assert!(!second
                .entries
                .iter()
                .any(|e| e.candidate_id == entry.candidate_id));
        }
    }

    #[tokio::test]
    async fn test_mutual_accept_and_decline() {
        let store = MemoryStore::new();
        let requester = verified(30);
        let candidate = verified(28);
        store.insert_profile(requester.clone()).unwrap();
        store.insert_profile(candidate.clone()).unwrap();

        let allocator = Allocator::default();
        let result = allocator
            .allocate_daily(&store, &LogNotifier, requester.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(result.entries.len(), 1);

        let one_sided = allocator
            .respond(
                &store,
                &LogNotifier,
                requester.id,
                candidate.id,
                MatchResponse::Accept,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(one_sided.status, MatchStatus::Pending);

        let mutual = allocator
            .respond(
                &store,
                &LogNotifier,
                candidate.id,
                requester.id,
                MatchResponse::Accept,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(mutual.status, MatchStatus::Matched);

        // A late decline is a no-op reporting the standing state
        let late = allocator
            .respond(
                &store,
                &LogNotifier,
                requester.id,
                candidate.id,
                MatchResponse::Decline,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(late.status, MatchStatus::Matched);
    }
}
