use crate::models::{
    AllocateMatchesRequest, AllocateMatchesResponse, HealthResponse, RespondRequest,
    RespondResponse,
};
use crate::routes::{core_error_response, AppState};
use actix_web::{web, HttpResponse, Responder};

/// Configure match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/allocate", web::post().to(allocate_matches))
        .route("/matches/respond", web::post().to(respond));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Allocate the day's matches endpoint
///
/// POST /api/v1/matches/allocate
///
/// Request body:
/// ```json
/// {
///   "userId": "uuid"
/// }
/// ```
///
/// Idempotent within the UTC day: repeat calls return the committed set.
async fn allocate_matches(
    state: web::Data<AppState>,
    req: web::Json<AllocateMatchesRequest>,
) -> impl Responder {
    let user_id = req.user_id;

    tracing::info!("Allocating daily matches for user: {}", user_id);

    let result = state
        .allocator
        .allocate_daily(
            state.store.as_ref(),
            state.notifier.as_ref(),
            user_id,
            chrono::Utc::now(),
        )
        .await;

    match result {
        Ok(allocation) => {
            tracing::info!(
                "Returning {} matches for user {} in window {} (from_existing={})",
                allocation.entries.len(),
                user_id,
                allocation.window_key,
                allocation.from_existing
            );

            HttpResponse::Ok().json(AllocateMatchesResponse {
                window_key: allocation.window_key,
                matches: allocation.entries,
                quota: allocation.quota,
                quota_exhausted: allocation.quota_exhausted,
                from_existing: allocation.from_existing,
            })
        }
        Err(e) => {
            tracing::warn!("Allocation failed for {}: {}", user_id, e);
            core_error_response(&e)
        }
    }
}

/// Respond to an allocated match endpoint
///
/// POST /api/v1/matches/respond
///
/// Request body:
/// ```json
/// {
///   "userId": "uuid",
///   "otherUserId": "uuid",
///   "response": "accept|decline"
/// }
/// ```
async fn respond(state: web::Data<AppState>, req: web::Json<RespondRequest>) -> impl Responder {
    let result = state
        .allocator
        .respond(
            state.store.as_ref(),
            state.notifier.as_ref(),
            req.user_id,
            req.other_user_id,
            req.response,
            chrono::Utc::now(),
        )
        .await;

    match result {
        Ok(record) => HttpResponse::Ok().json(RespondResponse {
            user_a: record.user_a,
            user_b: record.user_b,
            score: record.score,
            status: record.status,
        }),
        Err(e) => {
            tracing::warn!(
                "Match response failed for ({}, {}): {}",
                req.user_id,
                req.other_user_id,
                e
            );
            core_error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }
}
