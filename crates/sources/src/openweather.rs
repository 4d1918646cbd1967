//! OpenWeatherMap adapter.
//!
//! Calls `/forecast` (3-hourly, five days) and `/weather` concurrently and
//! folds the forecast into one entry per calendar day. Either call failing
//! fails the sync.

use agromind_core::error::UpstreamError;
use agromind_core::farm::{CurrentConditions, DailyForecast, GeoPoint, WeatherSnapshot};
use agromind_core::source::DataSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "openweather";

/// Days kept from the forecast.
const FORECAST_DAYS: usize = 5;

pub struct OpenWeatherSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: crate::http_client(NAME, timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, endpoint: &str, point: &GeoPoint) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
    }
}

#[async_trait]
impl DataSource for OpenWeatherSource {
    type Query = GeoPoint;
    type Snapshot = WeatherSnapshot;

    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, point: &GeoPoint) -> Result<WeatherSnapshot, UpstreamError> {
        let (forecast, current): (ForecastResponse, CurrentResponse) = tokio::try_join!(
            crate::send_json(NAME, self.request("forecast", point)),
            crate::send_json(NAME, self.request("weather", point)),
        )?;

        debug!(items = forecast.list.len(), city = %forecast.city.name, "Forecast received");
        reshape(forecast, current, Utc::now())
    }
}

/// Fold the provider's payloads into a snapshot.
fn reshape(
    forecast: ForecastResponse,
    current: CurrentResponse,
    now: DateTime<Utc>,
) -> Result<WeatherSnapshot, UpstreamError> {
    Ok(WeatherSnapshot {
        region: forecast.city.name,
        current: Some(CurrentConditions {
            temp: current.main.temp,
            wind_speed: current.wind.speed,
            sunrise: current.sys.sunrise,
            sunset: current.sys.sunset,
        }),
        forecast: daily_forecast(&forecast.list)?,
        last_updated: now,
    })
}

#[derive(Default)]
struct DayTally {
    date: String,
    temps: Vec<f64>,
    descriptions: Vec<(String, usize)>,
    icons: Vec<(String, usize)>,
}

fn bump(counts: &mut Vec<(String, usize)>, value: &str) {
    match counts.iter_mut().find(|(v, _)| v == value) {
        Some((_, n)) => *n += 1,
        None => counts.push((value.to_string(), 1)),
    }
}

/// The most frequent value; on a tie the value seen later wins.
fn most_common(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .fold(None::<&(String, usize)>, |best, entry| match best {
            Some(b) if b.1 > entry.1 => Some(b),
            _ => Some(entry),
        })
        .map(|(v, _)| v.clone())
        .unwrap_or_default()
}

/// Group 3-hourly items by calendar day in first-seen order, keep five days.
fn daily_forecast(items: &[ForecastItem]) -> Result<Vec<DailyForecast>, UpstreamError> {
    let mut days: Vec<DayTally> = Vec::new();

    for item in items {
        let date = item
            .dt_txt
            .split_whitespace()
            .next()
            .ok_or_else(|| UpstreamError::malformed(NAME, "forecast item without dt_txt"))?;
        let condition = item
            .weather
            .first()
            .ok_or_else(|| UpstreamError::malformed(NAME, format!("no conditions for {date}")))?;

        let day = match days.iter().position(|d| d.date == date) {
            Some(i) => &mut days[i],
            None => {
                days.push(DayTally {
                    date: date.to_string(),
                    ..Default::default()
                });
                let last = days.len() - 1;
                &mut days[last]
            }
        };
        day.temps.push(item.main.temp);
        bump(&mut day.descriptions, &condition.description);
        bump(&mut day.icons, &condition.icon);
    }

    Ok(days
        .into_iter()
        .take(FORECAST_DAYS)
        .map(|day| DailyForecast {
            temp_max: day.temps.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            temp_min: day.temps.iter().copied().fold(f64::INFINITY, f64::min),
            description: most_common(&day.descriptions),
            icon: most_common(&day.icons),
            date: day.date,
        })
        .collect())
}

// --- OpenWeather API types (internal) ---

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
    city: City,
}

#[derive(Debug, Deserialize)]
struct City {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt_txt: String,
    main: MainReadings,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainReadings,
    wind: Wind,
    sys: Sys,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Sys {
    sunrise: i64,
    sunset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(dt_txt: &str, temp: f64, description: &str, icon: &str) -> serde_json::Value {
        json!({
            "dt": 0,
            "dt_txt": dt_txt,
            "main": {"temp": temp, "humidity": 60},
            "weather": [{"id": 800, "main": "Clear", "description": description, "icon": icon}]
        })
    }

    fn current() -> CurrentResponse {
        serde_json::from_value(json!({
            "main": {"temp": 24.3},
            "wind": {"speed": 3.1, "deg": 180},
            "sys": {"sunrise": 1762130000, "sunset": 1762170000}
        }))
        .unwrap()
    }

    #[test]
    fn groups_by_day_with_extremes() {
        let forecast: ForecastResponse = serde_json::from_value(json!({
            "list": [
                item("2025-11-03 09:00:00", 21.0, "clear sky", "01d"),
                item("2025-11-03 12:00:00", 27.6, "clear sky", "01d"),
                item("2025-11-03 15:00:00", 25.2, "few clouds", "02d"),
                item("2025-11-04 00:00:00", 14.9, "light rain", "10n"),
            ],
            "city": {"name": "Ludhiana"}
        }))
        .unwrap();

        let snapshot = reshape(forecast, current(), Utc::now()).unwrap();
        assert_eq!(snapshot.region, "Ludhiana");
        assert_eq!(snapshot.forecast.len(), 2);

        let today = &snapshot.forecast[0];
        assert_eq!(today.date, "2025-11-03");
        assert_eq!(today.temp_max, 27.6);
        assert_eq!(today.temp_min, 21.0);
        assert_eq!(today.description, "clear sky");
        assert_eq!(today.icon, "01d");

        let current = snapshot.current.unwrap();
        assert_eq!(current.wind_speed, 3.1);
        assert_eq!(current.sunrise, 1762130000);
    }

    #[test]
    fn keeps_five_days_in_first_seen_order() {
        let list: Vec<_> = (1..=7)
            .map(|d| item(&format!("2025-11-0{d} 12:00:00"), 20.0, "haze", "50d"))
            .collect();
        let forecast: ForecastResponse =
            serde_json::from_value(json!({"list": list, "city": {"name": "Patiala"}})).unwrap();

        let days = daily_forecast(&forecast.list).unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0].date, "2025-11-01");
        assert_eq!(days[4].date, "2025-11-05");
    }

    #[test]
    fn tie_goes_to_later_value() {
        let counts = vec![("clear sky".to_string(), 2), ("light rain".to_string(), 2)];
        assert_eq!(most_common(&counts), "light rain");

        let counts = vec![("clear sky".to_string(), 3), ("light rain".to_string(), 2)];
        assert_eq!(most_common(&counts), "clear sky");
    }

    #[test]
    fn item_without_conditions_is_malformed() {
        let forecast: ForecastResponse = serde_json::from_value(json!({
            "list": [{"dt_txt": "2025-11-03 09:00:00", "main": {"temp": 20.0}, "weather": []}],
            "city": {"name": "Amritsar"}
        }))
        .unwrap();
        let err = daily_forecast(&forecast.list).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed { .. }));
    }

    #[test]
    fn missing_city_fails_to_decode() {
        let result: Result<ForecastResponse, _> = serde_json::from_value(json!({"list": []}));
        assert!(result.is_err());
    }
}
