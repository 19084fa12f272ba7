use crate::models::{
    AllocatedMatch, Allocation, CandidateFilter, MatchRecord, MatchResponse, MatchStatus,
    Preference, Profile, VerificationStatus, WindowKey,
};
use crate::services::store::{CommitOutcome, ProfileStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// PostgreSQL-backed profile store.
///
/// The CAS contracts are carried by conditional writes: verification
/// transitions are `UPDATE .. WHERE verification_status = expected`, and
/// allocation commits are `INSERT .. ON CONFLICT DO NOTHING` on the
/// (user, window) primary key. Both make concurrent writers observe a
/// single winner without table locks.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_secs: u64,
        idle_timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(idle_timeout_secs))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            acquire_timeout_secs.unwrap_or(5),
            idle_timeout_secs.unwrap_or(600),
        )
        .await
    }

    /// Deserialize an enum or JSONB column into its domain type.
    fn parse_column<T>(column: &str, raw: serde_json::Value) -> Result<T, StoreError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(raw)
            .map_err(|e| StoreError::InvalidRecord(format!("bad {} column: {}", column, e)))
    }

    fn profile_from_row(row: &PgRow) -> Result<Profile, StoreError> {
        Ok(Profile {
            id: row.get("id"),
            display_name: row.get("display_name"),
            age: row.get::<i16, _>("age") as u8,
            gender: Self::parse_column(
                "gender",
                serde_json::Value::String(row.get::<String, _>("gender")),
            )?,
            state: row.get("state"),
            lga: row.get("lga"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            religion: row.get("religion"),
            tribe: row.get("tribe"),
            education: row.get("education"),
            complexion: row.get("complexion"),
            lifestyle: Self::parse_column(
                "lifestyle",
                row.get::<serde_json::Value, _>("lifestyle"),
            )?,
            bio: row.get("bio"),
            interests: Self::parse_column(
                "interests",
                row.get::<serde_json::Value, _>("interests"),
            )?,
            partner_values: Self::parse_column(
                "partner_values",
                row.get::<serde_json::Value, _>("partner_values"),
            )?,
            archetype: match row.get::<Option<String>, _>("archetype") {
                Some(raw) => Some(Self::parse_column("archetype", serde_json::Value::String(raw))?),
                None => None,
            },
            verification_status: Self::parse_column(
                "verification_status",
                serde_json::Value::String(row.get::<String, _>("verification_status")),
            )?,
            verification_submitted_at: row.get("verification_submitted_at"),
            reviewed_by: row.get("reviewed_by"),
            reviewed_at: row.get("reviewed_at"),
            is_premium: row.get("is_premium"),
            photo_refs: Self::parse_column(
                "photo_refs",
                row.get::<serde_json::Value, _>("photo_refs"),
            )?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn preference_from_row(row: &PgRow) -> Result<Preference, StoreError> {
        Ok(Preference {
            user_id: row.get("user_id"),
            min_age: row.get::<i16, _>("min_age") as u8,
            max_age: row.get::<i16, _>("max_age") as u8,
            max_distance_km: row.get::<Option<i16>, _>("max_distance_km").map(|v| v as u16),
            preferred_education: Self::parse_column(
                "preferred_education",
                row.get::<serde_json::Value, _>("preferred_education"),
            )?,
            preferred_religion: Self::parse_column(
                "preferred_religion",
                row.get::<serde_json::Value, _>("preferred_religion"),
            )?,
            preferred_tribe: Self::parse_column(
                "preferred_tribe",
                row.get::<serde_json::Value, _>("preferred_tribe"),
            )?,
            preferred_complexion: Self::parse_column(
                "preferred_complexion",
                row.get::<serde_json::Value, _>("preferred_complexion"),
            )?,
            deal_breakers: Self::parse_column(
                "deal_breakers",
                row.get::<serde_json::Value, _>("deal_breakers"),
            )?,
        })
    }

    fn match_from_row(row: &PgRow) -> Result<MatchRecord, StoreError> {
        let status: String = row.get("status");
        let status = serde_json::from_value(serde_json::Value::String(status))
            .map_err(|e| StoreError::InvalidRecord(format!("bad status column: {}", e)))?;

        Ok(MatchRecord {
            user_a: row.get("user_a"),
            user_b: row.get("user_b"),
            score: row.get("score"),
            status,
            accepted_a: row.get("accepted_a"),
            accepted_b: row.get("accepted_b"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn allocation_from_row(row: &PgRow) -> Result<Allocation, StoreError> {
        let entries: serde_json::Value = row.get("entries");
        let entries: Vec<AllocatedMatch> = serde_json::from_value(entries)
            .map_err(|e| StoreError::InvalidRecord(format!("bad entries column: {}", e)))?;

        Ok(Allocation {
            user_id: row.get("user_id"),
            window_key: WindowKey(row.get("window_key")),
            entries,
            committed_at: row.get("committed_at"),
        })
    }
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn get_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;

        Self::profile_from_row(&row)
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Option<Preference>, StoreError> {
        let row = sqlx::query("SELECT * FROM preferences WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::preference_from_row).transpose()
    }

    async fn query_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Profile>, StoreError> {
        // Only verified profiles surface, the requester is excluded, and so
        // is anyone already paired with them in the matches table. The whole
        // eligible pool comes back; ranking and truncation happen after
        // scoring, so no candidate is dropped before its score is known.
        let query = r#"
            SELECT p.* FROM profiles p
            WHERE p.id <> $1
              AND p.verification_status = 'verified'
              AND p.age >= $2 AND p.age <= $3
              AND NOT EXISTS (
                  SELECT 1 FROM matches m
                  WHERE m.user_a = LEAST($1, p.id)
                    AND m.user_b = GREATEST($1, p.id)
              )
            ORDER BY p.id ASC
        "#;

        let rows = sqlx::query(query)
            .bind(filter.requester_id)
            .bind(filter.min_age as i16)
            .bind(filter.max_age as i16)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::profile_from_row).collect()
    }

    async fn cas_update_verification_status(
        &self,
        user_id: Uuid,
        expected: VerificationStatus,
        new: VerificationStatus,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let query = r#"
            UPDATE profiles
            SET verification_status = $3, reviewed_by = $4, reviewed_at = $5, updated_at = $5
            WHERE id = $1 AND verification_status = $2
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(expected.as_str())
            .bind(new.as_str())
            .bind(admin_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn cas_commit_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
        entries: &[AllocatedMatch],
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let entries_json = serde_json::to_value(entries)
            .map_err(|e| StoreError::InvalidRecord(format!("unserializable entries: {}", e)))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO allocations (user_id, window_key, entries, committed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, window_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(window.as_str())
        .bind(&entries_json)
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // Lost the window to a concurrent commit; hand back the winner.
            tx.rollback().await?;
            let existing = self
                .get_allocation(user_id, window)
                .await?
                .ok_or_else(|| {
                    StoreError::Database("allocation conflict but no committed row".into())
                })?;
            return Ok(CommitOutcome::AlreadyExists(existing));
        }

        for entry in entries {
            let (user_a, user_b) = MatchRecord::normalize_pair(user_id, entry.candidate_id);
            let result = sqlx::query(
                r#"
                INSERT INTO matches (user_a, user_b, score, status, accepted_a, accepted_b, created_at, updated_at)
                VALUES ($1, $2, $3, 'pending', FALSE, FALSE, $4, $4)
                "#,
            )
            .bind(user_a)
            .bind(user_b)
            .bind(entry.score)
            .bind(at)
            .execute(&mut *tx)
            .await;

            if let Err(e) = &result {
                let unique_violation = e
                    .as_database_error()
                    .map(|d| d.is_unique_violation())
                    .unwrap_or(false);
                if unique_violation {
                    tx.rollback().await?;
                    return Err(StoreError::InvalidRecord(format!(
                        "match record already exists for pair ({}, {})",
                        user_a, user_b
                    )));
                }
            }
            result?;
        }

        tx.commit().await?;

        Ok(CommitOutcome::Committed(Allocation {
            user_id,
            window_key: window.clone(),
            entries: entries.to_vec(),
            committed_at: at,
        }))
    }

    async fn get_allocation(
        &self,
        user_id: Uuid,
        window: &WindowKey,
    ) -> Result<Option<Allocation>, StoreError> {
        let row = sqlx::query("SELECT * FROM allocations WHERE user_id = $1 AND window_key = $2")
            .bind(user_id)
            .bind(window.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::allocation_from_row).transpose()
    }

    async fn pending_verifications(&self) -> Result<Vec<Profile>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM profiles
            WHERE verification_status = 'pending'
            ORDER BY verification_submitted_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::profile_from_row).collect()
    }

    async fn reopen_verification(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET verification_status = 'pending', verification_submitted_at = $2,
                reviewed_by = NULL, reviewed_at = NULL, updated_at = $2
            WHERE id = $1 AND verification_status = 'rejected'
            "#,
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish "wrong state" from "no such profile"
        let exists = sqlx::query("SELECT 1 FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if exists {
            Ok(false)
        } else {
            Err(StoreError::NotFound(format!("profile {}", user_id)))
        }
    }

    async fn get_match(&self, a: Uuid, b: Uuid) -> Result<Option<MatchRecord>, StoreError> {
        let (user_a, user_b) = MatchRecord::normalize_pair(a, b);
        let row = sqlx::query("SELECT * FROM matches WHERE user_a = $1 AND user_b = $2")
            .bind(user_a)
            .bind(user_b)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::match_from_row).transpose()
    }

    async fn record_match_response(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        response: MatchResponse,
        at: DateTime<Utc>,
    ) -> Result<MatchRecord, StoreError> {
        let (user_a, user_b) = MatchRecord::normalize_pair(user_id, other_id);
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM matches WHERE user_a = $1 AND user_b = $2 FOR UPDATE")
            .bind(user_a)
            .bind(user_b)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("match ({}, {})", user_a, user_b)))?;

        let mut record = Self::match_from_row(&row)?;

        if record.status != MatchStatus::Pending {
            tx.rollback().await?;
            return Err(StoreError::Conflict(format!(
                "match ({}, {}) is already {}",
                user_a,
                user_b,
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

        sqlx::query(
            r#"
            UPDATE matches
            SET status = $3, accepted_a = $4, accepted_b = $5, updated_at = $6
            WHERE user_a = $1 AND user_b = $2
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(record.status.as_str())
        .bind(record.accepted_a)
        .bind(record.accepted_b)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, LifestyleFlag};
    use serde_json::json;

    #[test]
    fn test_parse_column_handles_distinct_target_types() {
        let gender: Gender = PostgresStore::parse_column("gender", json!("female")).unwrap();
        assert_eq!(gender, Gender::Female);

        let flags: Vec<LifestyleFlag> =
            PostgresStore::parse_column("lifestyle", json!(["smoker"])).unwrap();
        assert_eq!(flags, vec![LifestyleFlag::Smoker]);

        let interests: Vec<String> =
            PostgresStore::parse_column("interests", json!(["music", "art"])).unwrap();
        assert_eq!(interests, vec!["music".to_string(), "art".to_string()]);
    }

    #[test]
    fn test_parse_column_names_the_bad_column() {
        let result: Result<Gender, StoreError> =
            PostgresStore::parse_column("gender", json!("unknown"));
        match result {
            Err(StoreError::InvalidRecord(msg)) => assert!(msg.contains("gender")),
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }
}
