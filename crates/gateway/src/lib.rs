//! HTTP API gateway for AgroMind.
//!
//! Exposes the farmer-facing REST surface under `/api`: registration and
//! login, the dashboard, crop log CRUD, data-sync triggers, and the
//! advisory query endpoint. `/health` sits outside the prefix.
//!
//! Built on Axum; every handler shares one immutable [`AppState`].

pub mod auth;
pub mod crops;
pub mod error;
pub mod query;
pub mod sync;

use axum::extract::{DefaultBodyLimit, Path};
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use agromind_advisor::{Advisor, AdvisorSettings};
use agromind_core::farm::{Crop, Farmer, MarketSnapshot, SoilSnapshot, WeatherSnapshot};
use agromind_core::store::FarmStore;
use agromind_sources::Sources;

use crate::error::ApiError;

/// Shared application state for the gateway.
pub struct AppState {
    pub store: Arc<dyn FarmStore>,
    /// `None` when no model provider is configured
    pub advisor: Option<Arc<Advisor>>,
    pub sources: Sources,
    pub bcrypt_cost: u32,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, body_limit: usize) -> Router {
    let api = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/dashboard/{farmer_id}", get(dashboard_handler))
        .route("/crops", post(crops::create_crop_handler))
        .route(
            "/crops/{id}",
            get(crops::list_crops_handler)
                .put(crops::update_crop_handler)
                .delete(crops::delete_crop_handler),
        )
        .route("/weather/sync", post(sync::weather_sync_handler))
        .route("/market/sync", post(sync::market_sync_handler))
        .route("/soilgrids-stats", post(sync::soil_sync_handler))
        .route("/query", post(query::query_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: agromind_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store = agromind_store::open_from_config(&config.store).await?;
    info!(backend = store.name(), "Store opened");

    let advisor = agromind_providers::build_from_config(&config)?.map(|provider| {
        info!(provider = provider.name(), model = %config.provider.model, "Advisory queries enabled");
        Arc::new(Advisor::new(
            store.clone(),
            provider,
            AdvisorSettings::from_config(&config),
        ))
    });

    let sources = agromind_sources::build_from_config(&config)?;

    let state = Arc::new(AppState {
        store,
        advisor,
        sources,
        bcrypt_cost: config.auth.bcrypt_cost,
    });
    let app = build_router(state, config.gateway.body_limit_bytes);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct DashboardResponse {
    farmer: Farmer,
    weather: Option<WeatherSnapshot>,
    market: Option<MarketSnapshot>,
    soil: Option<SoilSnapshot>,
    crops: Vec<Crop>,
}

/// Everything the farmer's home screen shows, read in one go.
async fn dashboard_handler(
    State(state): State<SharedState>,
    Path(farmer_id): Path<String>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let store = &state.store;
    let (farmer, weather, market, soil, crops) = tokio::try_join!(
        store.find_farmer(&farmer_id),
        store.weather(&farmer_id),
        store.market(&farmer_id),
        store.soil(&farmer_id),
        store.list_crops(&farmer_id),
    )?;

    let farmer = farmer.ok_or_else(|| ApiError::not_found("Farmer not found"))?;
    Ok(Json(DashboardResponse {
        farmer,
        weather,
        market,
        soil,
        crops,
    }))
}
