use crate::models::{NotificationEvent, NotificationKind};
use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outbound edge towards the notification transport. Delivery mechanics
/// (push tokens, channels) are entirely external; the core only emits
/// events, and always fire-and-forget.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Default sink: structured log lines picked up by the delivery pipeline.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn deliver(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(
            kind = ?event.kind,
            user = %event.user_id,
            payload = %event.payload,
            "notification emitted"
        );
        Ok(())
    }
}

/// Emit an event and swallow delivery failures with a warning. State
/// transitions must stand regardless of whether the notification made it
/// out.
pub async fn emit_best_effort<N: NotificationSink + ?Sized>(sink: &N, event: NotificationEvent) {
    let kind = event.kind;
    let user_id = event.user_id;
    if let Err(e) = sink.deliver(event).await {
        tracing::warn!(?kind, user = %user_id, "notification delivery failed: {}", e);
    }
}

pub fn new_match_event(user_id: Uuid, other_id: Uuid, score: f64) -> NotificationEvent {
    NotificationEvent {
        kind: NotificationKind::NewMatch,
        user_id,
        payload: json!({ "matchedWith": other_id, "score": score }),
    }
}

pub fn verification_event(user_id: Uuid, approved: bool) -> NotificationEvent {
    NotificationEvent {
        kind: if approved {
            NotificationKind::VerificationApproved
        } else {
            NotificationKind::VerificationRejected
        },
        user_id,
        payload: json!({}),
    }
}

pub fn daily_matches_event(user_id: Uuid, count: usize) -> NotificationEvent {
    NotificationEvent {
        kind: NotificationKind::DailyMatchesReady,
        user_id,
        payload: json!({ "count": count }),
    }
}
