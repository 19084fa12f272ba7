use crate::error::CoreError;
use crate::models::{Profile, VerificationDecision, VerificationStatus};
use crate::services::notify::{emit_best_effort, verification_event, NotificationSink};
use crate::services::store::ProfileStore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Outcome of a successful verification decision.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub user_id: Uuid,
    pub status: VerificationStatus,
    pub decided_by: Uuid,
    pub decided_at: DateTime<Utc>,
}

/// Verification state machine: `pending` → `verified` | `rejected`, both
/// terminal. Two admins racing on one submission produce exactly one
/// effective transition; the loser gets `AlreadyResolved`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationWorkflow;

impl VerificationWorkflow {
    pub fn new() -> Self {
        Self
    }

    /// Apply an admin decision to a pending submission.
    ///
    /// The transition is a conditional write on `status = pending`. A failed
    /// write gets one fresh read: if the record turned terminal meanwhile
    /// the caller gets `AlreadyResolved`; a second unexplained failure is
    /// `StoreUnavailable`. The notification is emitted after the transition
    /// stands and never rolls it back.
    pub async fn decide<S, N>(
        &self,
        store: &S,
        sink: &N,
        user_id: Uuid,
        decision: VerificationDecision,
        admin_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Resolution, CoreError>
    where
        S: ProfileStore + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let profile = store.get_profile(user_id).await?;
        if profile.verification_status.is_terminal() {
            return Err(CoreError::AlreadyResolved {
                current: profile.verification_status,
            });
        }

        let target = match decision {
            VerificationDecision::Approve => VerificationStatus::Verified,
            VerificationDecision::Reject => VerificationStatus::Rejected,
        };

        let mut moved = store
            .cas_update_verification_status(
                user_id,
                VerificationStatus::Pending,
                target,
                admin_id,
                now,
            )
            .await?;

        if !moved {
            let fresh = store.get_profile(user_id).await?;
            if fresh.verification_status.is_terminal() {
                return Err(CoreError::AlreadyResolved {
                    current: fresh.verification_status,
                });
            }
            // Still pending after a failed conditional write; one retry.
            moved = store
                .cas_update_verification_status(
                    user_id,
                    VerificationStatus::Pending,
                    target,
                    admin_id,
                    now,
                )
                .await?;
            if !moved {
                let last = store.get_profile(user_id).await?;
                if last.verification_status.is_terminal() {
                    return Err(CoreError::AlreadyResolved {
                        current: last.verification_status,
                    });
                }
                return Err(CoreError::StoreUnavailable(format!(
                    "verification transition for {} failed twice",
                    user_id
                )));
            }
        }

        tracing::info!(
            user = %user_id,
            admin = %admin_id,
            status = %target,
            "verification resolved"
        );

        emit_best_effort(
            sink,
            verification_event(user_id, target == VerificationStatus::Verified),
        )
        .await;

        Ok(Resolution {
            user_id,
            status: target,
            decided_by: admin_id,
            decided_at: now,
        })
    }

    /// Pending submissions, oldest first. The FIFO ordering is a fairness
    /// contract towards the admin surface.
    pub async fn pending_queue<S>(&self, store: &S) -> Result<Vec<Profile>, CoreError>
    where
        S: ProfileStore + ?Sized,
    {
        Ok(store.pending_verifications().await?)
    }

    /// Resubmission after rejection: resets the profile to pending with a
    /// fresh submission timestamp. Not a workflow transition; terminal
    /// states stay terminal under `decide`.
    pub async fn reopen<S>(
        &self,
        store: &S,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError>
    where
        S: ProfileStore + ?Sized,
    {
        let reopened = store.reopen_verification(user_id, now).await?;
        if !reopened {
            let profile = store.get_profile(user_id).await?;
            return Err(CoreError::NotEligible(format!(
                "only rejected submissions can be reopened, {} is {}",
                user_id, profile.verification_status
            )));
        }
        Ok(())
    }
}
