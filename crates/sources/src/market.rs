//! data.gov.in mandi price adapter ("Current daily price of various
//! commodities from various markets").

use agromind_core::error::UpstreamError;
use agromind_core::farm::{MarketPrice, MarketSnapshot};
use agromind_core::source::DataSource;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::debug;

const NAME: &str = "data.gov.in";

/// Distinct commodities kept per snapshot.
const MAX_COMMODITIES: usize = 10;

pub struct DataGovMarketSource {
    client: reqwest::Client,
    resource_url: String,
    api_key: String,
    record_limit: u32,
}

impl DataGovMarketSource {
    pub fn new(
        resource_url: impl Into<String>,
        api_key: impl Into<String>,
        record_limit: u32,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: crate::http_client(NAME, timeout)?,
            resource_url: resource_url.into(),
            api_key: api_key.into(),
            record_limit,
        })
    }
}

#[async_trait]
impl DataSource for DataGovMarketSource {
    type Query = String;
    type Snapshot = MarketSnapshot;

    fn name(&self) -> &str {
        NAME
    }

    /// `region` is matched against the dataset's `state` column.
    async fn fetch(&self, region: &String) -> Result<MarketSnapshot, UpstreamError> {
        let limit = self.record_limit.to_string();
        let request = self.client.get(&self.resource_url).query(&[
            ("api-key", self.api_key.as_str()),
            ("format", "json"),
            ("limit", limit.as_str()),
            ("filters[state]", region.as_str()),
        ]);

        let response: RecordsResponse = crate::send_json(NAME, request).await?;
        debug!(region = %region, records = response.records.len(), "Mandi records received");

        Ok(MarketSnapshot {
            top_prices: top_prices(response.records),
            last_updated: Utc::now(),
        })
    }
}

/// First record per commodity wins; provider order is kept.
fn top_prices(records: Vec<MarketRecord>) -> Vec<MarketPrice> {
    let mut prices: Vec<MarketPrice> = Vec::with_capacity(MAX_COMMODITIES);
    for record in records {
        if prices.len() == MAX_COMMODITIES {
            break;
        }
        if prices.iter().any(|p| p.commodity == record.commodity) {
            continue;
        }
        prices.push(MarketPrice {
            commodity: record.commodity,
            mandi: record.market,
            modal_price: record.modal_price,
        });
    }
    prices
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    records: Vec<MarketRecord>,
}

#[derive(Debug, Deserialize)]
struct MarketRecord {
    commodity: String,
    #[serde(default)]
    market: String,
    #[serde(deserialize_with = "string_or_number")]
    modal_price: String,
}

/// The API reports prices as strings, but some mirrors send numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<MarketRecord> {
        serde_json::from_value::<RecordsResponse>(value).unwrap().records
    }

    #[test]
    fn first_seen_commodity_wins() {
        let prices = top_prices(records(json!({
            "records": [
                {"state": "Punjab", "market": "Khanna", "commodity": "Wheat", "modal_price": "2275"},
                {"state": "Punjab", "market": "Rajpura", "commodity": "Paddy(Dhan)(Common)", "modal_price": "2183"},
                {"state": "Punjab", "market": "Jagraon", "commodity": "Wheat", "modal_price": "2300"}
            ]
        })));

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].commodity, "Wheat");
        assert_eq!(prices[0].mandi, "Khanna");
        assert_eq!(prices[0].modal_price, "2275");
        assert_eq!(prices[1].commodity, "Paddy(Dhan)(Common)");
    }

    #[test]
    fn caps_at_ten_commodities() {
        let list: Vec<_> = (0..15)
            .map(|i| json!({"market": "Mandi", "commodity": format!("C{i}"), "modal_price": "100"}))
            .collect();
        let prices = top_prices(records(json!({ "records": list })));
        assert_eq!(prices.len(), 10);
        assert_eq!(prices[9].commodity, "C9");
    }

    #[test]
    fn numeric_price_is_kept_as_text() {
        let prices = top_prices(records(json!({
            "records": [{"market": "Karnal", "commodity": "Mustard", "modal_price": 5650}]
        })));
        assert_eq!(prices[0].modal_price, "5650");
    }

    #[test]
    fn missing_records_field_fails_to_decode() {
        let result: Result<RecordsResponse, _> =
            serde_json::from_value(json!({"message": "Invalid key"}));
        assert!(result.is_err());
    }
}
