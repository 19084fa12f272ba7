use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use amora_core::config::Settings;
use amora_core::core::{Allocator, EntitlementGate, VerificationWorkflow};
use amora_core::models::ScoringWeights;
use amora_core::routes::{self, AppState};
use amora_core::services::{
    CacheManager, CachedStore, LogNotifier, NotificationSink, PostgresStore, ProfileStore,
};
use std::sync::Arc;
use tracing::{error, info};

/// JSON error response for payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST),
        )
        .content_type("application/json")
        .body(serde_json::to_string(self).unwrap_or_default())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(
    err: error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration first so logging settings apply
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level)),
        )
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Amora Core service...");

    // Initialize PostgreSQL store and run migrations
    let db_max_conn = settings.database.max_connections.unwrap_or(10);

    let postgres: Arc<dyn ProfileStore> = Arc::new(
        PostgresStore::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .unwrap_or_else(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            panic!("PostgreSQL connection error: {}", e);
        }),
    );

    info!(
        "PostgreSQL store initialized (max: {} connections)",
        db_max_conn
    );

    // Cache for profile, preference and entitlement reads; the store is
    // wrapped so profile reads hit the database only on a cache miss
    let cache_capacity = settings.cache.capacity.unwrap_or(10_000);
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let cache = Arc::new(CacheManager::new(cache_capacity, cache_ttl));
    let store: Arc<dyn ProfileStore> = Arc::new(CachedStore::new(postgres, cache.clone()));

    info!(
        "Cache initialized ({} entries, TTL: {}s)",
        cache_capacity, cache_ttl
    );

    // Allocator, workflow and gate from configured weights and quotas
    let weights = ScoringWeights {
        interests: settings.scoring.weights.interests,
        partner_values: settings.scoring.weights.partner_values,
        archetype: settings.scoring.weights.archetype,
        preferred_dimension: settings.scoring.weights.preferred_dimension,
    };

    let gate = EntitlementGate::new(settings.quota.free_daily, settings.quota.premium_daily);
    let allocator = Allocator::new(weights, gate);
    let workflow = VerificationWorkflow::new();

    info!(
        "Allocator initialized with weights: {:?}, quotas: free={} premium={}",
        weights, settings.quota.free_daily, settings.quota.premium_daily
    );

    let notifier: Arc<dyn NotificationSink> = Arc::new(LogNotifier::default());

    let app_state = AppState {
        store,
        notifier,
        cache,
        allocator,
        workflow,
        gate,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
