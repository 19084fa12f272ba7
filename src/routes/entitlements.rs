use crate::core::Feature;
use crate::models::{EntitlementQuery, EntitlementResponse, ErrorResponse};
use crate::routes::{core_error_response, AppState};
use crate::services::CacheKey;
use actix_web::{web, HttpResponse, Responder};

/// Configure entitlement routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/entitlements/check", web::get().to(check_entitlement));
}

/// Entitlement check endpoint
///
/// GET /api/v1/entitlements/check?userId={uuid}&feature=advanced_filter:religion
///
/// Pure capability lookup over the stored premium flag; client-supplied
/// tier claims are never consulted.
async fn check_entitlement(
    state: web::Data<AppState>,
    query: web::Query<EntitlementQuery>,
) -> impl Responder {
    let feature = match Feature::parse(&query.feature) {
        Some(feature) => feature,
        None => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid feature".to_string(),
                message: format!(
                    "unknown feature '{}'; expected daily_quota, see_likers, read_receipts \
                     or advanced_filter:<education|religion|tribe|complexion>",
                    query.feature
                ),
                status_code: 400,
            });
        }
    };

    let cache_key = CacheKey::entitlement(query.user_id, &query.feature);
    if let Ok(cached) = state.cache.get::<EntitlementResponse>(&cache_key).await {
        tracing::debug!("Entitlement cache hit for {}", cache_key);
        return HttpResponse::Ok().json(cached);
    }

    let profile = match state.store.get_profile(query.user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!("Entitlement check failed for {}: {}", query.user_id, e);
            return core_error_response(&e.into());
        }
    };

    let response = EntitlementResponse {
        user_id: query.user_id,
        feature: query.feature.clone(),
        permitted: state.gate.permits(&profile, feature),
        daily_quota: state.gate.daily_quota(&profile),
    };

    if let Err(e) = state.cache.set(&cache_key, &response).await {
        tracing::warn!("Failed to cache entitlement result: {}", e);
    }

    HttpResponse::Ok().json(response)
}
