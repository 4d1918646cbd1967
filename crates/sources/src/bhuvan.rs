//! NRSC Bhuvan soil adapter.
//!
//! Posts a WPS `Execute` request for the `gs:SoilWPS` process at the
//! midpoint of the field and asks for a raw JSON result. Only the first
//! `Soil_Data` record is used.

use agromind_core::error::UpstreamError;
use agromind_core::farm::{BoundingBox, GeoPoint, SoilSnapshot};
use agromind_core::source::DataSource;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "bhuvan";

pub struct BhuvanSoilSource {
    client: reqwest::Client,
    wps_url: String,
}

impl BhuvanSoilSource {
    pub fn new(wps_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: crate::http_client(NAME, timeout)?,
            wps_url: wps_url.into(),
        })
    }
}

#[async_trait]
impl DataSource for BhuvanSoilSource {
    type Query = BoundingBox;
    type Snapshot = SoilSnapshot;

    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, bbox: &BoundingBox) -> Result<SoilSnapshot, UpstreamError> {
        let point = bbox.midpoint();
        debug!(lat = point.lat, lon = point.lon, "Querying Bhuvan soil WPS");

        let request = self
            .client
            .post(&self.wps_url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(execute_request(point));

        let response: WpsResponse = crate::send_json(NAME, request).await?;
        to_snapshot(response)
    }
}

fn execute_request(point: GeoPoint) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:Execute xmlns:wps="http://www.opengis.net/wps/1.0.0" xmlns:ows="http://www.opengis.net/ows/1.1" service="WPS" version="1.0.0">
  <ows:Identifier>gs:SoilWPS</ows:Identifier>
  <wps:DataInputs>
    <wps:Input>
      <ows:Identifier>lat</ows:Identifier>
      <wps:Data><wps:LiteralData>{lat}</wps:LiteralData></wps:Data>
    </wps:Input>
    <wps:Input>
      <ows:Identifier>lon</ows:Identifier>
      <wps:Data><wps:LiteralData>{lon}</wps:LiteralData></wps:Data>
    </wps:Input>
  </wps:DataInputs>
  <wps:ResponseForm>
    <wps:RawDataOutput mimeType="application/json">
      <ows:Identifier>result</ows:Identifier>
    </wps:RawDataOutput>
  </wps:ResponseForm>
</wps:Execute>"#,
        lat = point.lat,
        lon = point.lon,
    )
}

fn to_snapshot(response: WpsResponse) -> Result<SoilSnapshot, UpstreamError> {
    let record = response
        .soil_data
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::Empty {
            source_name: NAME.to_string(),
        })?;

    Ok(SoilSnapshot {
        ph: number(&record.soil_ph, "SOIL_PH")?,
        soc: number(&record.organic_carbon, "ORGANIC_CA")?,
        clay: None,
        soil_type: text(&record.soil_type),
        texture: text(&record.texture),
        depth: text(&record.depth),
        last_updated: Utc::now(),
    })
}

/// Bhuvan sends numbers either as JSON numbers or as strings.
fn number(value: &Value, field: &str) -> Result<f64, UpstreamError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| UpstreamError::malformed(NAME, format!("{field} is not numeric: {value}")))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct WpsResponse {
    #[serde(rename = "Soil_Data", default)]
    soil_data: Vec<SoilRecord>,
}

#[derive(Debug, Deserialize)]
struct SoilRecord {
    #[serde(rename = "SOIL_TYPE", default)]
    soil_type: Value,
    #[serde(rename = "TEXTURAL_C", default)]
    texture: Value,
    #[serde(rename = "SOIL_DEPTH", default)]
    depth: Value,
    #[serde(rename = "SOIL_PH", default)]
    soil_ph: Value,
    #[serde(rename = "ORGANIC_CA", default)]
    organic_carbon: Value,
}
