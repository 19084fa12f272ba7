use crate::models::{
    ErrorResponse, PendingVerification, PendingVerificationsQuery, PendingVerificationsResponse,
    ReopenVerificationRequest, ResolveVerificationRequest, ResolveVerificationResponse,
};
use crate::routes::{core_error_response, AppState};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Configure verification workflow routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/verifications/pending", web::get().to(pending_queue))
        .route("/verifications/resolve", web::post().to(resolve))
        .route("/verifications/reopen", web::post().to(reopen));
}

/// Pending verification queue endpoint
///
/// GET /api/v1/verifications/pending?limit=50
///
/// Oldest submissions first.
async fn pending_queue(
    state: web::Data<AppState>,
    query: web::Query<PendingVerificationsQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let limit = query.limit.unwrap_or(50) as usize;

    match state.workflow.pending_queue(state.store.as_ref()).await {
        Ok(profiles) => {
            let pending: Vec<PendingVerification> = profiles
                .into_iter()
                .take(limit)
                .map(|p| PendingVerification {
                    user_id: p.id,
                    display_name: p.display_name,
                    submitted_at: p.verification_submitted_at,
                    photo_refs: p.photo_refs,
                })
                .collect();
            let count = pending.len();

            HttpResponse::Ok().json(PendingVerificationsResponse { pending, count })
        }
        Err(e) => {
            tracing::error!("Failed to fetch pending verifications: {}", e);
            core_error_response(&e)
        }
    }
}

/// Resolve a pending verification endpoint
///
/// POST /api/v1/verifications/resolve
///
/// Request body:
/// ```json
/// {
///   "userId": "uuid",
///   "decision": "approve|reject",
///   "adminId": "uuid"
/// }
/// ```
///
/// A submission already decided returns 409 with the standing status.
async fn resolve(
    state: web::Data<AppState>,
    req: web::Json<ResolveVerificationRequest>,
) -> impl Responder {
    let result = state
        .workflow
        .decide(
            state.store.as_ref(),
            state.notifier.as_ref(),
            req.user_id,
            req.decision,
            req.admin_id,
            chrono::Utc::now(),
        )
        .await;

    match result {
        Ok(resolution) => HttpResponse::Ok().json(ResolveVerificationResponse {
            user_id: resolution.user_id,
            status: resolution.status,
            decided_by: resolution.decided_by,
            decided_at: resolution.decided_at,
        }),
        Err(e) => {
            tracing::warn!(
                "Verification decision failed for {} by admin {}: {}",
                req.user_id,
                req.admin_id,
                e
            );
            core_error_response(&e)
        }
    }
}

/// Reopen a rejected verification endpoint
///
/// POST /api/v1/verifications/reopen
async fn reopen(
    state: web::Data<AppState>,
    req: web::Json<ReopenVerificationRequest>,
) -> impl Responder {
    match state
        .workflow
        .reopen(state.store.as_ref(), req.user_id, chrono::Utc::now())
        .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "userId": req.user_id,
            "status": "pending",
        })),
        Err(e) => {
            tracing::warn!("Reopen failed for {}: {}", req.user_id, e);
            core_error_response(&e)
        }
    }
}
