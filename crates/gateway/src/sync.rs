//! Data-sync triggers: fetch from an upstream adapter and replace the
//! farmer's snapshot.

use crate::SharedState;
use crate::error::ApiError;
use agromind_core::error::Error;
use agromind_core::farm::{
    BoundingBox, Farmer, GeoPoint, MarketSnapshot, SoilSnapshot, WeatherSnapshot,
};
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct WeatherSyncRequest {
    pub farmer_id: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct MarketSyncRequest {
    pub farmer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SoilSyncRequest {
    pub farmer_id: String,
    pub bbox: BoundingBox,
}

async fn require_farmer(state: &SharedState, farmer_id: &str) -> Result<Farmer, ApiError> {
    state
        .store
        .find_farmer(farmer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Farmer not found"))
}

fn not_configured(feature: &str) -> ApiError {
    ApiError(Error::NotConfigured(format!("{feature} sync is not configured")))
}

fn check_point(lat: f64, lon: f64) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::validation(format!(
            "({lat}, {lon}) is not a valid coordinate"
        )));
    }
    Ok(())
}

/// `POST /api/weather/sync`. The stored region is the farmer's, not the
/// provider's city name.
pub async fn weather_sync_handler(
    State(state): State<SharedState>,
    Json(payload): Json<WeatherSyncRequest>,
) -> Result<Json<WeatherSnapshot>, ApiError> {
    check_point(payload.lat, payload.lon)?;
    let source = state
        .sources
        .weather
        .clone()
        .ok_or_else(|| not_configured("Weather"))?;
    let farmer = require_farmer(&state, &payload.farmer_id).await?;

    let mut snapshot = source
        .fetch(&GeoPoint {
            lat: payload.lat,
            lon: payload.lon,
        })
        .await?;
    snapshot.region = farmer.region.clone();

    let stored = state.store.upsert_weather(&farmer.id, snapshot).await?;
    info!(farmer_id = %farmer.id, days = stored.forecast.len(), "Weather synced");
    Ok(Json(stored))
}

/// `POST /api/market/sync`. Prices are filtered by the farmer's region.
pub async fn market_sync_handler(
    State(state): State<SharedState>,
    Json(payload): Json<MarketSyncRequest>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    let source = state
        .sources
        .market
        .clone()
        .ok_or_else(|| not_configured("Market"))?;
    let farmer = require_farmer(&state, &payload.farmer_id).await?;
    if farmer.region.is_empty() {
        return Err(ApiError::validation(
            "farmer has no region to look up mandi prices for",
        ));
    }

    let snapshot = source.fetch(&farmer.region).await?;
    let stored = state.store.upsert_market(&farmer.id, snapshot).await?;
    info!(farmer_id = %farmer.id, commodities = stored.top_prices.len(), "Market synced");
    Ok(Json(stored))
}

/// `POST /api/soilgrids-stats`.
pub async fn soil_sync_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SoilSyncRequest>,
) -> Result<Json<SoilSnapshot>, ApiError> {
    let mid = payload.bbox.midpoint();
    check_point(mid.lat, mid.lon)?;
    let source = state
        .sources
        .soil
        .clone()
        .ok_or_else(|| not_configured("Soil"))?;
    let farmer = require_farmer(&state, &payload.farmer_id).await?;

    let snapshot = source.fetch(&payload.bbox).await?;
    let stored = state.store.upsert_soil(&farmer.id, snapshot).await?;
    info!(farmer_id = %farmer.id, source = source.name(), "Soil synced");
    Ok(Json(stored))
}
