pub mod entitlements;
pub mod matches;
pub mod verifications;

use crate::core::{Allocator, EntitlementGate, VerificationWorkflow};
use crate::error::CoreError;
use crate::models::ErrorResponse;
use crate::services::{CacheManager, NotificationSink, ProfileStore};
use actix_web::HttpResponse;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub notifier: Arc<dyn NotificationSink>,
    pub cache: Arc<CacheManager>,
    pub allocator: Allocator,
    pub workflow: VerificationWorkflow,
    pub gate: EntitlementGate,
}

/// Configure all routes under the /api/v1 scope
pub fn configure_routes(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api/v1")
            .configure(matches::configure)
            .configure(verifications::configure)
            .configure(entitlements::configure),
    );
}

/// Map a core error onto the HTTP surface.
///
/// `NotEligible` is a policy refusal (403), `AlreadyResolved` a state
/// conflict (409), `StoreUnavailable` a retryable outage (503), and
/// `InvariantViolation` a bug (500). Quota exhaustion is not an error and
/// never reaches this path.
pub(crate) fn core_error_response(err: &CoreError) -> HttpResponse {
    let status_code: u16 = match err {
        CoreError::NotEligible(_) => 403,
        CoreError::AlreadyResolved { .. } => 409,
        CoreError::StoreUnavailable(_) => 503,
        CoreError::InvariantViolation(_) => 500,
    };

    let body = ErrorResponse {
        error: err.kind().to_string(),
        message: err.to_string(),
        status_code,
    };

    match status_code {
        403 => HttpResponse::Forbidden().json(body),
        409 => HttpResponse::Conflict().json(body),
        503 => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}
