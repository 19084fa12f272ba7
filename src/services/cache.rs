use crate::models::{
    AllocatedMatch, Allocation, CandidateFilter, MatchRecord, MatchResponse, Preference, Profile,
    VerificationStatus, WindowKey,
};
use crate::services::store::{CommitOutcome, ProfileStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache miss: {0}")]
    Miss(String),
}

/// In-process TTL cache. Match and allocation state are never served from
/// here; those reads must see the store's committed state.
pub struct CacheManager {
    entries: moka::future::Cache<String, Vec<u8>>,
}

impl CacheManager {
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { entries }
    }

    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.entries.get(key).await {
            tracing::trace!("cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }
        tracing::trace!("cache miss: {}", key);
        Err(CacheError::Miss(key.to_string()))
    }

    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let bytes = serde_json::to_vec(value)?;
        self.entries.insert(key.to_string(), bytes).await;
        Ok(())
    }

    pub async fn delete(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    pub fn profile(user_id: Uuid) -> String {
        format!("profile:{}", user_id)
    }

    pub fn preferences(user_id: Uuid) -> String {
        format!("prefs:{}", user_id)
    }

    pub fn entitlement(user_id: Uuid, feature: &str) -> String {
        format!("entitlement:{}:{}", user_id, feature)
    }
}

/// Read-through cache over a `ProfileStore`. Profile and preference reads
/// are served from the TTL cache; every other operation goes straight to
/// the wrapped store. Verification writes invalidate the profile entry so
/// eligibility checks pick up the transition immediately.
pub struct CachedStore {
    inner: Arc<dyn ProfileStore>,
    cache: Arc<CacheManager>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn ProfileStore>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    async fn cache_profile(&self, profile: &Profile) {
        if let Err(e) = self.cache.set(&CacheKey::profile(profile.id), profile).await {
            tracing::warn!("failed to cache profile {}: {}", profile.id, e);
        }
    }
}

#[async_trait]
impl ProfileStore for CachedStore {
    async fn get_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
        if let Ok(profile) = self.cache.get::<Profile>(&CacheKey::profile(id)).await {
            return Ok(profile);
        }
        let profile = self.inner.get_profile(id).await?;
        self.cache_profile(&profile).await;
        Ok(profile)
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Option<Preference>, StoreError> {
        let key = CacheKey::preferences(user_id);
        if let Ok(prefs) = self.cache.get::<Preference>(&key).await {
            return Ok(Some(prefs));
        }
        let prefs = self.inner.get_preferences(user_id).await?;
        // Absence is not cached; a freshly stored preference set must be
        // visible on the next read.
        if let Some(prefs) = &prefs {
            if let Err(e) = self.cache.set(&key, prefs).await {
                tracing::warn!("failed to cache preferences for {}: {}", user_id, e);
            }
        }
        Ok(prefs)
    }

    async fn query_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Profile>, StoreError> {
        self.inner.query_candidates(filter).await
    }

    async fn cas_update_verification_status(
        &self,
        user_id: Uuid,
        expected: VerificationStatus,
        new: VerificationStatus,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let applied = self
            .inner
            .cas_update_verification_status(user_id, expected, new, admin_id, at)
            .await?;
        if applied {
            self.cache.delete(&CacheKey::profile(user_id)).await;
        }
        Ok(applied)
    }

    async fn cas_commit_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
        entries: &[AllocatedMatch],
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome, StoreError> {
        self.inner
            .cas_commit_allocation(user_id, window, entries, at)
            .await
    }

    async fn get_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
    ) -> Result<Option<Allocation>, StoreError> {
        self.inner.get_allocation(user_id, window).await
    }

    async fn pending_verifications(&self) -> Result<Vec<Profile>, StoreError> {
        self.inner.pending_verifications().await
    }

    async fn reopen_verification(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let applied = self.inner.reopen_verification(user_id, at).await?;
        if applied {
            self.cache.delete(&CacheKey::profile(user_id)).await;
        }
        Ok(applied)
    }

    async fn get_match(&self, a: Uuid, b: Uuid) -> Result<Option<MatchRecord>, StoreError> {
        self.inner.get_match(a, b).await
    }

    async fn record_match_response(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        response: MatchResponse,
        at: DateTime<Utc>,
    ) -> Result<MatchRecord, StoreError> {
        self.inner
            .record_match_response(user_id, other_id, response, at)
            .await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use crate::services::memory::MemoryStore;

    #[tokio::test]
    async fn test_cache_set_get_delete() {
        let cache = CacheManager::new(100, 60);

        cache.set("k", &"value".to_string()).await.unwrap();
        let got: String = cache.get("k").await.unwrap();
        assert_eq!(got, "value");

        cache.delete("k").await;
        assert!(cache.get::<String>("k").await.is_err());
    }

    #[test]
    fn test_miss_after_invalidate_all() {
        tokio_test::block_on(async {
            let cache = CacheManager::new(100, 60);
            cache.set("a", &1u32).await.unwrap();
            cache.set("b", &2u32).await.unwrap();

            cache.invalidate_all();
            cache.entries.run_pending_tasks().await;

            assert!(cache.get::<u32>("a").await.is_err());
            assert!(cache.get::<u32>("b").await.is_err());
        });
    }

    fn profile(status: VerificationStatus) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            display_name: "Test".to_string(),
            age: 30,
            gender: Gender::Female,
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

    #[tokio::test]
    async fn test_profile_reads_are_served_from_cache() {
        let inner = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheManager::new(100, 60));
        let store = CachedStore::new(inner.clone(), cache);

        let original = profile(VerificationStatus::Verified);
        inner.insert_profile(original.clone()).unwrap();
        let first = store.get_profile(original.id).await.unwrap();
        assert_eq!(first.display_name, original.display_name);

        // Rename directly in the backing store; the cached copy answers
        let mut renamed = original.clone();
        renamed.display_name = "Renamed".to_string();
        inner.insert_profile(renamed).unwrap();

        let second = store.get_profile(original.id).await.unwrap();
        assert_eq!(second.display_name, original.display_name);
    }

    #[tokio::test]
    async fn test_verification_write_invalidates_cached_profile() {
        let inner = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheManager::new(100, 60));
        let store = CachedStore::new(inner.clone(), cache);

        let pending = profile(VerificationStatus::Pending);
        inner.insert_profile(pending.clone()).unwrap();
        let cached = store.get_profile(pending.id).await.unwrap();
        assert_eq!(cached.verification_status, VerificationStatus::Pending);

        let applied = store
            .cas_update_verification_status(
                pending.id,
                VerificationStatus::Pending,
                VerificationStatus::Verified,
                Uuid::new_v4(),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(applied);

        let fresh = store.get_profile(pending.id).await.unwrap();
        assert_eq!(fresh.verification_status, VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn test_preference_absence_is_not_cached() {
        let inner = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheManager::new(100, 60));
        let store = CachedStore::new(inner.clone(), cache);

        let user_id = Uuid::new_v4();
        assert!(store.get_preferences(user_id).await.unwrap().is_none());

        inner
            .insert_preferences(Preference::unconstrained(user_id))
            .unwrap();
        assert!(store.get_preferences(user_id).await.unwrap().is_some());
    }

    #[test]
    fn test_cache_key_builder() {
        let id = Uuid::nil();
        assert_eq!(CacheKey::profile(id), format!("profile:{}", id));
        assert_eq!(CacheKey::preferences(id), format!("prefs:{}", id));
        assert_eq!(
            CacheKey::entitlement(id, "see_likers"),
            format!("entitlement:{}:see_likers", id)
        );
    }
}
