//! intake-server library - legacy portal customer intake
//!
//! Caching proxy over the legacy portal's customer listing, a dashboard query
//! engine over the cached collection, and intake of legacy customers into
//! local customer and contact records.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use intake_common::config::Settings;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod correlation;
pub mod db;
pub mod error;
pub mod pagination;
pub mod pipeline;
pub mod query;
pub mod upstream;
pub mod validation;

use cache::{CollectionCache, IntakeTokens};
use upstream::UpstreamClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Local customer database
    pub db: SqlitePool,
    /// Legacy portal client
    pub upstream: Arc<UpstreamClient>,
    /// Filtered, deduplicated latest-customer listing
    pub collection: Arc<CollectionCache>,
    /// Intake tokens minted by `/customer/intake/:legacy_id`
    pub tokens: IntakeTokens,
    pub collection_ttl: Duration,
    /// Set while a background refresh is running
    pub refresh_in_flight: Arc<AtomicBool>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        upstream: UpstreamClient,
        collection_ttl: Duration,
        intake_token_ttl: Duration,
    ) -> Self {
        Self {
            db,
            upstream: Arc::new(upstream),
            collection: Arc::new(CollectionCache::new()),
            tokens: IntakeTokens::new(intake_token_ttl),
            collection_ttl,
            refresh_in_flight: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
        }
    }

    /// State wired from resolved settings
    pub fn from_settings(db: SqlitePool, settings: &Settings) -> intake_common::Result<Self> {
        let upstream = UpstreamClient::new(
            &settings.customer_latest_url,
            &settings.refresh_latest_inspection_url,
        )?;
        Ok(Self::new(
            db,
            upstream,
            settings.collection_ttl,
            settings.intake_token_ttl,
        ))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let proxy = Router::new()
        .route("/proxy/customer-latest", get(api::customer_latest))
        .route(
            "/proxy/latest-inspection-refresh",
            post(api::refresh_latest_inspection),
        );

    let dashboard = Router::new().route("/dashboard", get(api::dashboard));

    let intake = Router::new()
        .route("/customer/intake/:legacy_id", get(api::start_intake))
        .route("/customer/create", get(api::create_form))
        .route(
            "/customers",
            get(api::list_customers).post(api::store_customer),
        )
        .route(
            "/customer/:id",
            get(api::show_customer).put(api::update_customer),
        )
        .route("/customer/:id/records", post(api::store_contact_record));

    Router::new()
        .merge(proxy)
        .merge(dashboard)
        .merge(intake)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(correlation::correlation_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
