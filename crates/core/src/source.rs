//! DataSource trait — one upstream weather, market or soil provider.
//!
//! Each implementation fetches from exactly one third-party API and
//! reshapes the payload into a fixed snapshot type. Failures come back as
//! [`UpstreamError`] values; nothing is retried.

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::farm::{BoundingBox, GeoPoint, MarketSnapshot, SoilSnapshot, WeatherSnapshot};

#[async_trait]
pub trait DataSource: Send + Sync {
    /// What the provider is asked about (a point, a region, an area).
    type Query: Send + Sync;

    /// The normalized record the provider's payload is reshaped into.
    type Snapshot: Send;

    /// Provider name used in logs and errors (e.g., "openweather").
    fn name(&self) -> &str;

    async fn fetch(&self, query: &Self::Query) -> Result<Self::Snapshot, UpstreamError>;
}

/// Weather at a point.
pub type WeatherSource = dyn DataSource<Query = GeoPoint, Snapshot = WeatherSnapshot>;

/// Mandi prices for a region (state name).
pub type MarketSource = dyn DataSource<Query = String, Snapshot = MarketSnapshot>;

/// Soil properties for a field's bounding box.
pub type SoilSource = dyn DataSource<Query = BoundingBox, Snapshot = SoilSnapshot>;
