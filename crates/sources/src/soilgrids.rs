//! ISRIC SoilGrids v2.0 adapter.
//!
//! Queries the midpoint of the field's bounding box for `phh2o`, `soc` and
//! `clay` at 0-5cm. SoilGrids reports these in mapped units (pH×10, dg/kg,
//! g/kg×10); every mean is divided by ten.

use agromind_core::error::UpstreamError;
use agromind_core::farm::{BoundingBox, GeoPoint, SoilSnapshot};
use agromind_core::source::DataSource;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "soilgrids";
const DEPTH: &str = "0-5cm";
const VALUE: &str = "mean";
const SCALE: f64 = 10.0;

pub struct SoilGridsSource {
    client: reqwest::Client,
    base_url: String,
}

impl SoilGridsSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: crate::http_client(NAME, timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn property(&self, point: GeoPoint, property: &str) -> Result<f64, UpstreamError> {
        let request = self
            .client
            .get(format!("{}/properties/query", self.base_url))
            .query(&[
                ("lon", point.lon.to_string()),
                ("lat", point.lat.to_string()),
                ("property", property.to_string()),
                ("depth", DEPTH.to_string()),
                ("value", VALUE.to_string()),
            ]);

        let response: QueryResponse = crate::send_json(NAME, request).await?;
        scaled_mean(&response, property)
    }
}

#[async_trait]
impl DataSource for SoilGridsSource {
    type Query = BoundingBox;
    type Snapshot = SoilSnapshot;

    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, bbox: &BoundingBox) -> Result<SoilSnapshot, UpstreamError> {
        let point = bbox.midpoint();
        debug!(lat = point.lat, lon = point.lon, "Querying SoilGrids");

        let (ph, soc, clay) = tokio::try_join!(
            self.property(point, "phh2o"),
            self.property(point, "soc"),
            self.property(point, "clay"),
        )?;

        Ok(SoilSnapshot {
            ph,
            soc,
            clay: Some(clay),
            soil_type: None,
            texture: None,
            depth: None,
            last_updated: Utc::now(),
        })
    }
}

/// First layer, first depth, `mean` ÷ 10.
fn scaled_mean(response: &QueryResponse, property: &str) -> Result<f64, UpstreamError> {
    response
        .properties
        .layers
        .first()
        .and_then(|layer| layer.depths.first())
        .and_then(|depth| depth.values.mean)
        .map(|mean| mean / SCALE)
        .ok_or_else(|| UpstreamError::malformed(NAME, format!("no mean value for {property}")))
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    layers: Vec<Layer>,
}

#[derive(Debug, Deserialize)]
struct Layer {
    #[serde(default)]
    depths: Vec<Depth>,
}

#[derive(Debug, Deserialize)]
struct Depth {
    values: Values,
}

#[derive(Debug, Deserialize)]
struct Values {
    mean: Option<f64>,
}
