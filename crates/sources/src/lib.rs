//! External data adapters for AgroMind.
//!
//! Each adapter implements `agromind_core::DataSource` for exactly one
//! third-party API and reshapes its payload into a snapshot:
//!
//! - [`OpenWeatherSource`] — 5-day forecast plus current conditions
//! - [`DataGovMarketSource`] — mandi modal prices from data.gov.in
//! - [`SoilGridsSource`] — ISRIC SoilGrids pH / organic carbon / clay
//! - [`BhuvanSoilSource`] — NRSC Bhuvan soil profile (WPS)
//!
//! Nothing here retries. Every client carries the configured timeout.

pub mod bhuvan;
pub mod market;
pub mod openweather;
pub mod soilgrids;

pub use bhuvan::BhuvanSoilSource;
pub use market::DataGovMarketSource;
pub use openweather::OpenWeatherSource;
pub use soilgrids::SoilGridsSource;

use agromind_core::error::UpstreamError;
use agromind_core::source::{MarketSource, SoilSource, WeatherSource};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The adapters a server can sync from. `None` means the feature has no key.
#[derive(Clone, Default)]
pub struct Sources {
    pub weather: Option<Arc<WeatherSource>>,
    pub market: Option<Arc<MarketSource>>,
    pub soil: Option<Arc<SoilSource>>,
}

/// Build every adapter `[sources]` has enough configuration for.
pub fn build_from_config(config: &agromind_config::AppConfig) -> Result<Sources, UpstreamError> {
    let sources = &config.sources;
    let timeout = Duration::from_secs(sources.request_timeout_secs);

    let weather: Option<Arc<WeatherSource>> = match &sources.openweather_api_key {
        Some(key) => Some(Arc::new(OpenWeatherSource::new(
            &sources.openweather_url,
            key,
            timeout,
        )?)),
        None => {
            info!("No OpenWeather key configured; weather sync disabled");
            None
        }
    };

    let market: Option<Arc<MarketSource>> = match &sources.market_api_key {
        Some(key) => Some(Arc::new(DataGovMarketSource::new(
            &sources.market_url,
            key,
            sources.market_record_limit,
            timeout,
        )?)),
        None => {
            info!("No data.gov.in key configured; market sync disabled");
            None
        }
    };

    let soil: Arc<SoilSource> = match sources.soil_provider.as_str() {
        "bhuvan" => Arc::new(BhuvanSoilSource::new(&sources.bhuvan_url, timeout)?),
        _ => Arc::new(SoilGridsSource::new(&sources.soilgrids_url, timeout)?),
    };

    Ok(Sources {
        weather,
        market,
        soil: Some(soil),
    })
}

pub(crate) fn http_client(source_name: &str, timeout: Duration) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UpstreamError::network(source_name, format!("HTTP client: {e}")))
}

/// Send a request and decode a JSON body, mapping every failure to an
/// [`UpstreamError`] tagged with `source_name`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    source_name: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, UpstreamError> {
    let response = request
        .send()
        .await
        .map_err(|e| UpstreamError::network(source_name, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(source = source_name, status = status.as_u16(), body = %body, "Upstream returned error");
        return Err(UpstreamError::Status {
            source_name: source_name.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::network(source_name, e))?;
    serde_json::from_str(&body).map_err(|e| UpstreamError::malformed(source_name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyless_config_enables_only_soil() {
        let config = agromind_config::AppConfig::default();
        let sources = build_from_config(&config).unwrap();
        assert!(sources.weather.is_none());
        assert!(sources.market.is_none());
        assert_eq!(sources.soil.unwrap().name(), "soilgrids");
    }

    #[test]
    fn keys_enable_weather_and_market() {
        let mut config = agromind_config::AppConfig::default();
        config.sources.openweather_api_key = Some("ow".into());
        config.sources.market_api_key = Some("dg".into());
        config.sources.soil_provider = "bhuvan".into();
        let sources = build_from_config(&config).unwrap();
        assert_eq!(sources.weather.unwrap().name(), "openweather");
        assert_eq!(sources.market.unwrap().name(), "data.gov.in");
        assert_eq!(sources.soil.unwrap().name(), "bhuvan");
    }
}
