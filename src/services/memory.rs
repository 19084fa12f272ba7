use crate::models::{
    AllocatedMatch, Allocation, CandidateFilter, MatchRecord, MatchResponse, MatchStatus,
    Preference, Profile, VerificationStatus, WindowKey, PLATFORM_MIN_AGE,
};
use crate::services::store::{CommitOutcome, ProfileStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-process store for tests and local development. Atomicity of the CAS
/// operations comes from the single interior lock; no lock is held across
/// an await point because every method completes synchronously.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<Uuid, Profile>,
    preferences: HashMap<Uuid, Preference>,
    matches: HashMap<(Uuid, Uuid), MatchRecord>,
    allocations: HashMap<(Uuid, WindowKey), Allocation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    /// Seed a profile. The platform minimum age is enforced here, at the
    /// store boundary.
    pub fn insert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        if profile.age < PLATFORM_MIN_AGE {
            return Err(StoreError::InvalidRecord(format!(
                "profile {} below platform minimum age",
                profile.id
            )));
        }
        self.lock()?.profiles.insert(profile.id, profile);
        Ok(())
    }

    pub fn insert_preferences(&self, prefs: Preference) -> Result<(), StoreError> {
        if prefs.min_age > prefs.max_age {
            return Err(StoreError::InvalidRecord(format!(
                "preference age range inverted for {}",
                prefs.user_id
            )));
        }
        self.lock()?.preferences.insert(prefs.user_id, prefs);
        Ok(())
    }

    pub fn match_count(&self) -> usize {
        self.inner.lock().map(|g| g.matches.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
        self.lock()?
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Option<Preference>, StoreError> {
        Ok(self.lock()?.preferences.get(&user_id).cloned())
    }

    async fn query_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Profile>, StoreError> {
        let guard = self.lock()?;

        let mut pool: Vec<Profile> = guard
            .profiles
            .values()
            .filter(|p| p.id != filter.requester_id)
            .filter(|p| p.is_verified())
            .filter(|p| p.age >= filter.min_age && p.age <= filter.max_age)
            .filter(|p| {
                let key = MatchRecord::normalize_pair(filter.requester_id, p.id);
                !guard.matches.contains_key(&key)
            })
            .cloned()
            .collect();

        // Deterministic pool order regardless of map iteration
        pool.sort_by_key(|p| p.id);
        Ok(pool)
    }

    async fn cas_update_verification_status(
        &self,
        user_id: Uuid,
        expected: VerificationStatus,
        new: VerificationStatus,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let profile = guard
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", user_id)))?;

        if profile.verification_status != expected {
            return Ok(false);
        }

        profile.verification_status = new;
        profile.reviewed_by = Some(admin_id);
        profile.reviewed_at = Some(at);
        profile.updated_at = at;
        Ok(true)
    }

    async fn cas_commit_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
        entries: &[AllocatedMatch],
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome, StoreError> {
        let mut guard = self.lock()?;
        let key = (user_id, window.clone());

        if let Some(existing) = guard.allocations.get(&key) {
            return Ok(CommitOutcome::AlreadyExists(existing.clone()));
        }

        // Duplicate pair here means the caller's pool exclusion failed
        for entry in entries {
            let pair = MatchRecord::normalize_pair(user_id, entry.candidate_id);
            if guard.matches.contains_key(&pair) {
                return Err(StoreError::InvalidRecord(format!(
                    "match record already exists for pair ({}, {})",
                    pair.0, pair.1
                )));
            }
        }

        for entry in entries {
            let (user_a, user_b) = MatchRecord::normalize_pair(user_id, entry.candidate_id);
            guard.matches.insert(
                (user_a, user_b),
                MatchRecord {
                    user_a,
                    user_b,
                    score: entry.score,
                    status: MatchStatus::Pending,
                    accepted_a: false,
                    accepted_b: false,
                    created_at: at,
                    updated_at: at,
                },
            );
        }

        let allocation = Allocation {
            user_id,
            window_key: window.clone(),
            entries: entries.to_vec(),
            committed_at: at,
        };
        guard.allocations.insert(key, allocation.clone());
        Ok(CommitOutcome::Committed(allocation))
    }

    async fn get_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
    ) -> Result<Option<Allocation>, StoreError> {
        Ok(self
            .lock()?
            .allocations
            .get(&(user_id, window.clone()))
            .cloned())
    }

    async fn pending_verifications(&self) -> Result<Vec<Profile>, StoreError> {
        let guard = self.lock()?;
        let mut pending: Vec<Profile> = guard
            .profiles
            .values()
            .filter(|p| p.verification_status == VerificationStatus::Pending)
            .cloned()
            .collect();

        pending.sort_by(|a, b| {
            a.verification_submitted_at
                .cmp(&b.verification_submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(pending)
    }

    async fn reopen_verification(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let profile = guard
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", user_id)))?;

        if profile.verification_status != VerificationStatus::Rejected {
            return Ok(false);
        }

        profile.verification_status = VerificationStatus::Pending;
        profile.verification_submitted_at = at;
        profile.reviewed_by = None;
        profile.reviewed_at = None;
        profile.updated_at = at;
        Ok(true)
    }

    async fn get_match(&self, a: Uuid, b: Uuid) -> Result<Option<MatchRecord>, StoreError> {
        let key = MatchRecord::normalize_pair(a, b);
        Ok(self.lock()?.matches.get(&key).cloned())
    }

    async fn record_match_response(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        response: MatchResponse,
        at: DateTime<Utc>,
    ) -> Result<MatchRecord, StoreError> {
        let mut guard = self.lock()?;
        let key = MatchRecord::normalize_pair(user_id, other_id);
        let record = guard
            .matches
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("match ({}, {})", key.0, key.1)))?;

        if record.status != MatchStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "match ({}, {}) is already {}",
                key.0,
                key.1,
                record.status.as_str()
            )));
        }

        match response {
            MatchResponse::Decline => {
                record.status = MatchStatus::Rejected;
            }
            MatchResponse::Accept => {
                if record.user_a == user_id {
                    record.accepted_a = true;
                } else {
                    record.accepted_b = true;
                }
                if record.accepted_a && record.accepted_b {
                    record.status = MatchStatus::Matched;
                }
            }
        }
        record.updated_at = at;
        Ok(record.clone())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn profile(status: VerificationStatus, age: u8) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            display_name: "Test".to_string(),
            age,
            gender: Gender::Male,
            state: "Lagos".to_string(),
            lga: "Ikeja".to_string(),
            latitude: None,
            longitude: None,
            religion: None,
            tribe: None,
            education: None,
            complexion: None,
            lifestyle: vec![],
            bio: None,
            interests: vec![],
            partner_values: vec![],
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

    #[test]
    fn test_underage_profile_rejected_at_boundary() {
        let store = MemoryStore::new();
        let result = store.insert_profile(profile(VerificationStatus::Pending, 17));
        assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_query_candidates_returns_verified_only() {
        let store = MemoryStore::new();
        let requester = profile(VerificationStatus::Verified, 30);
        let verified = profile(VerificationStatus::Verified, 28);
        let pending = profile(VerificationStatus::Pending, 28);
        let rejected = profile(VerificationStatus::Rejected, 28);

        store.insert_profile(requester.clone()).unwrap();
        store.insert_profile(verified.clone()).unwrap();
        store.insert_profile(pending).unwrap();
        store.insert_profile(rejected).unwrap();

        let pool = store
            .query_candidates(&CandidateFilter {
                requester_id: requester.id,
                min_age: 18,
                max_age: 99,
            })
            .await
            .unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, verified.id);
    }

    #[tokio::test]
    async fn test_query_candidates_excludes_existing_pairs() {
        let store = MemoryStore::new();
        let requester = profile(VerificationStatus::Verified, 30);
        let candidate = profile(VerificationStatus::Verified, 28);
        store.insert_profile(requester.clone()).unwrap();
        store.insert_profile(candidate.clone()).unwrap();

        let window = WindowKey::for_day(Utc::now());
        store
            .cas_commit_allocation(
                requester.id,
                &window,
                &[AllocatedMatch {
                    candidate_id: candidate.id,
                    score: 80.0,
                }],
                Utc::now(),
            )
            .await
            .unwrap();

        let pool = store
            .query_candidates(&CandidateFilter {
                requester_id: requester.id,
                min_age: 18,
                max_age: 99,
            })
            .await
            .unwrap();
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_allocation_commit_is_first_writer_wins() {
        let store = MemoryStore::new();
        let user = profile(VerificationStatus::Verified, 30);
        let c1 = profile(VerificationStatus::Verified, 28);
        let c2 = profile(VerificationStatus::Verified, 29);
        store.insert_profile(user.clone()).unwrap();
        store.insert_profile(c1.clone()).unwrap();
        store.insert_profile(c2.clone()).unwrap();

        let window = WindowKey::for_day(Utc::now());
        let first = store
            .cas_commit_allocation(
                user.id,
                &window,
                &[AllocatedMatch {
                    candidate_id: c1.id,
                    score: 75.0,
                }],
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(matches!(first, CommitOutcome::Committed(_)));

        let second = store
            .cas_commit_allocation(
                user.id,
                &window,
                &[AllocatedMatch {
                    candidate_id: c2.id,
                    score: 90.0,
                }],
                Utc::now(),
            )
            .await
            .unwrap();
        match second {
            CommitOutcome::AlreadyExists(existing) => {
                assert_eq!(existing.entries.len(), 1);
                assert_eq!(existing.entries[0].candidate_id, c1.id);
            }
            CommitOutcome::Committed(_) => panic!("second commit must not win"),
        }
    }

    #[tokio::test]
    async fn test_mutual_accept_transitions_to_matched() {
        let store = MemoryStore::new();
        let a = profile(VerificationStatus::Verified, 30);
        let b = profile(VerificationStatus::Verified, 28);
        store.insert_profile(a.clone()).unwrap();
        store.insert_profile(b.clone()).unwrap();

        let window = WindowKey::for_day(Utc::now());
        store
            .cas_commit_allocation(
                a.id,
                &window,
                &[AllocatedMatch {
                    candidate_id: b.id,
                    score: 70.0,
                }],
                Utc::now(),
            )
            .await
            .unwrap();

        let after_one = store
            .record_match_response(a.id, b.id, MatchResponse::Accept, Utc::now())
            .await
            .unwrap();
        assert_eq!(after_one.status, MatchStatus::Pending);

        let after_both = store
            .record_match_response(b.id, a.id, MatchResponse::Accept, Utc::now())
            .await
            .unwrap();
        assert_eq!(after_both.status, MatchStatus::Matched);
        assert_eq!(after_both.score, 70.0);

        // Terminal records reject further responses
        let again = store
            .record_match_response(a.id, b.id, MatchResponse::Decline, Utc::now())
            .await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reopen_only_applies_to_rejected() {
        let store = MemoryStore::new();
        let rejected = profile(VerificationStatus::Rejected, 30);
        let verified = profile(VerificationStatus::Verified, 30);
        store.insert_profile(rejected.clone()).unwrap();
        store.insert_profile(verified.clone()).unwrap();

        assert!(store
            .reopen_verification(rejected.id, Utc::now())
            .await
            .unwrap());
        assert!(!store
            .reopen_verification(verified.id, Utc::now())
            .await
            .unwrap());

        let reopened = store.get_profile(rejected.id).await.unwrap();
        assert_eq!(reopened.verification_status, VerificationStatus::Pending);
        assert!(reopened.reviewed_by.is_none());
    }

    #[tokio::test]
    async fn test_pending_queue_is_oldest_first() {
        let store = MemoryStore::new();
        let mut older = profile(VerificationStatus::Pending, 25);
        let mut newer = profile(VerificationStatus::Pending, 26);
        older.verification_submitted_at = Utc::now() - chrono::Duration::hours(2);
        newer.verification_submitted_at = Utc::now();

        // Insert newest first to prove ordering comes from timestamps
        store.insert_profile(newer.clone()).unwrap();
        store.insert_profile(older.clone()).unwrap();

        let queue = store.pending_verifications().await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, older.id);
        assert_eq!(queue[1].id, newer.id);
    }
}
