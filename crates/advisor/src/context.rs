//! Context aggregation: stored snapshots → four prompt sentences.
//!
//! A missing snapshot is never an error. Each source has a fixed sentence
//! that stands in for it, so the policy always receives four strings.

use agromind_core::error::StoreError;
use agromind_core::farm::{Crop, Farmer, MarketSnapshot, SoilSnapshot, WeatherSnapshot};
use agromind_core::store::FarmStore;
use std::sync::Arc;
use tracing::debug;

pub const WEATHER_UNAVAILABLE: &str = "Weather data not available.";
pub const MARKET_UNAVAILABLE: &str = "Market price data not available.";
pub const SOIL_UNAVAILABLE: &str = "Soil analysis data not available.";
pub const NO_CROPS: &str = "No crops are currently logged.";

/// The rendered context for one advisory request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryContext {
    /// Weather snapshot region if one is stored, else the farmer's own
    pub region: String,
    pub weather: String,
    pub market: String,
    pub soil: String,
    pub crops: String,
}

impl AdvisoryContext {
    pub fn render(
        farmer: &Farmer,
        weather: Option<&WeatherSnapshot>,
        market: Option<&MarketSnapshot>,
        soil: Option<&SoilSnapshot>,
        crops: &[Crop],
    ) -> Self {
        Self {
            region: weather
                .map(|w| w.region.clone())
                .unwrap_or_else(|| farmer.region.clone()),
            weather: render_weather(weather),
            market: render_market(market),
            soil: render_soil(soil),
            crops: render_crops(crops),
        }
    }
}

pub struct ContextAggregator {
    store: Arc<dyn FarmStore>,
}

impl ContextAggregator {
    pub fn new(store: Arc<dyn FarmStore>) -> Self {
        Self { store }
    }

    /// Read the farmer's four sources concurrently and render them.
    ///
    /// Fails only if the store fails.
    pub async fn aggregate(&self, farmer: &Farmer) -> Result<AdvisoryContext, StoreError> {
        let (weather, market, soil, crops) = tokio::try_join!(
            self.store.weather(&farmer.id),
            self.store.market(&farmer.id),
            self.store.soil(&farmer.id),
            self.store.list_crops(&farmer.id),
        )?;

        debug!(
            farmer_id = %farmer.id,
            weather = weather.is_some(),
            market = market.is_some(),
            soil = soil.is_some(),
            crops = crops.len(),
            "Context sources loaded"
        );

        Ok(AdvisoryContext::render(
            farmer,
            weather.as_ref(),
            market.as_ref(),
            soil.as_ref(),
            &crops,
        ))
    }
}

/// Uses today's entry only.
pub fn render_weather(snapshot: Option<&WeatherSnapshot>) -> String {
    match snapshot.and_then(|w| w.forecast.first()) {
        Some(today) => format!(
            "Today's forecast is {}, with a high of {}°C.",
            today.description,
            round_half_up(today.temp_max)
        ),
        None => WEATHER_UNAVAILABLE.to_string(),
    }
}

pub fn render_market(snapshot: Option<&MarketSnapshot>) -> String {
    match snapshot {
        Some(market) if !market.top_prices.is_empty() => {
            let prices: Vec<String> = market
                .top_prices
                .iter()
                .map(|p| format!("{}: ₹{}", p.commodity, p.modal_price))
                .collect();
            format!("Latest Mandi Prices: {}", prices.join(", "))
        }
        _ => MARKET_UNAVAILABLE.to_string(),
    }
}

pub fn render_soil(snapshot: Option<&SoilSnapshot>) -> String {
    match snapshot {
        Some(soil) => format!(
            "The last analyzed field has an average pH of {:.2}, Soil Organic Carbon of {:.2} g/kg.",
            soil.ph, soil.soc
        ),
        None => SOIL_UNAVAILABLE.to_string(),
    }
}

/// `crops` is expected newest planting first.
pub fn render_crops(crops: &[Crop]) -> String {
    if crops.is_empty() {
        return NO_CROPS.to_string();
    }
    let planted: Vec<String> = crops
        .iter()
        .map(|c| format!("{} (planted on {})", c.crop_name, c.planted_on()))
        .collect();
    format!("Currently planted: {}", planted.join(", "))
}

/// 27.5 → 28, -0.5 → 0.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use agromind_core::farm::{DailyForecast, MarketPrice, NewCrop, NewFarmer};
    use agromind_store::InMemoryStore;
    use chrono::{NaiveDate, Utc};

    fn day(description: &str, temp_max: f64) -> DailyForecast {
        DailyForecast {
            date: "2025-11-03".into(),
            temp_min: 15.0,
            temp_max,
            description: description.into(),
            icon: "01d".into(),
        }
    }

    fn weather(forecast: Vec<DailyForecast>) -> WeatherSnapshot {
        WeatherSnapshot {
            region: "Ludhiana".into(),
            current: None,
            forecast,
            last_updated: Utc::now(),
        }
    }

    fn price(commodity: &str, modal_price: &str) -> MarketPrice {
        MarketPrice {
            commodity: commodity.into(),
            mandi: "Khanna".into(),
            modal_price: modal_price.into(),
        }
    }

    #[test]
    fn weather_uses_first_entry_and_rounds_half_up() {
        let snapshot = weather(vec![day("clear sky", 27.5), day("heavy rain", 40.0)]);
        assert_eq!(
            render_weather(Some(&snapshot)),
            "Today's forecast is clear sky, with a high of 28°C."
        );

        let snapshot = weather(vec![day("haze", 31.49)]);
        assert_eq!(
            render_weather(Some(&snapshot)),
            "Today's forecast is haze, with a high of 31°C."
        );
    }

    #[test]
    fn weather_without_forecast_is_unavailable() {
        assert_eq!(render_weather(None), WEATHER_UNAVAILABLE);
        assert_eq!(render_weather(Some(&weather(vec![]))), WEATHER_UNAVAILABLE);
    }

    #[test]
    fn market_keeps_snapshot_order() {
        let snapshot = MarketSnapshot {
            top_prices: vec![price("Wheat", "2275"), price("Mustard", "5650"), price("Gram", "5100")],
            last_updated: Utc::now(),
        };
        assert_eq!(
            render_market(Some(&snapshot)),
            "Latest Mandi Prices: Wheat: ₹2275, Mustard: ₹5650, Gram: ₹5100"
        );
    }

    #[test]
    fn empty_market_is_unavailable() {
        let snapshot = MarketSnapshot {
            top_prices: vec![],
            last_updated: Utc::now(),
        };
        assert_eq!(render_market(Some(&snapshot)), MARKET_UNAVAILABLE);
    }

    #[test]
    fn soil_has_two_decimals() {
        let soil = SoilSnapshot {
            ph: 7.8,
            soc: 12.3,
            clay: Some(20.0),
            soil_type: None,
            texture: None,
            depth: None,
            last_updated: Utc::now(),
        };
        assert_eq!(
            render_soil(Some(&soil)),
            "The last analyzed field has an average pH of 7.80, Soil Organic Carbon of 12.30 g/kg."
        );
    }

    #[test]
    fn crops_use_en_in_dates() {
        let crop = NewCrop {
            farmer_id: "f1".into(),
            crop_name: "Mustard".into(),
            planting_date: NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
        }
        .into_crop();
        let older = NewCrop {
            farmer_id: "f1".into(),
            crop_name: "Potato".into(),
            planting_date: NaiveDate::from_ymd_opt(2025, 9, 20).unwrap(),
        }
        .into_crop();
        assert_eq!(
            render_crops(&[crop, older]),
            "Currently planted: Mustard (planted on 5/10/2025), Potato (planted on 20/9/2025)"
        );
        assert_eq!(render_crops(&[]), NO_CROPS);
    }

    #[tokio::test]
    async fn empty_farmer_gets_all_sentinels() {
        let store = Arc::new(InMemoryStore::new());
        let farmer = store
            .create_farmer(NewFarmer {
                name: "Asha".into(),
                username: "asha".into(),
                password_hash: "h".into(),
                region: "Bihar".into(),
                language: Some("hi-IN".into()),
            })
            .await
            .unwrap();

        let context = ContextAggregator::new(store).aggregate(&farmer).await.unwrap();
        assert_eq!(context.region, "Bihar");
        assert_eq!(context.weather, WEATHER_UNAVAILABLE);
        assert_eq!(context.market, MARKET_UNAVAILABLE);
        assert_eq!(context.soil, SOIL_UNAVAILABLE);
        assert_eq!(context.crops, NO_CROPS);
    }

    #[tokio::test]
    async fn weather_region_overrides_farmer_region() {
        let store = Arc::new(InMemoryStore::new());
        let farmer = store
            .create_farmer(NewFarmer {
                name: "Harjit".into(),
                username: "harjit".into(),
                password_hash: "h".into(),
                region: "Punjab".into(),
                language: None,
            })
            .await
            .unwrap();
        store
            .upsert_weather(&farmer.id, weather(vec![day("mist", 22.0)]))
            .await
            .unwrap();

        let context = ContextAggregator::new(store).aggregate(&farmer).await.unwrap();
        assert_eq!(context.region, "Ludhiana");
        assert!(context.weather.contains("mist"));
    }
}
