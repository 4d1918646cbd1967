//! Farm domain records: farmers, crops, conversation history, and the
//! per-farmer weather/market/soil snapshots.
//!
//! Snapshots are the single current copy of an upstream dataset for one
//! farmer. They are replaced wholesale on every sync and never accumulate.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Message, Role};

/// Language tag used when a farmer does not pick one.
pub const DEFAULT_LANGUAGE: &str = "en-IN";

// ── Farmer ────────────────────────────────────────────────────────────────

/// A registered farmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: String,

    /// Display name used in the advisory policy
    pub name: String,

    /// Unique login name
    pub username: String,

    /// bcrypt hash; never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// BCP-47 style tag, e.g. `hi-IN`
    pub language: String,

    /// Free-text region, e.g. a state name
    #[serde(default)]
    pub region: String,

    pub created_at: DateTime<Utc>,
}

/// Registration data with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewFarmer {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub region: String,
    pub language: Option<String>,
}

impl NewFarmer {
    /// Assign an id and creation time.
    pub fn into_farmer(self) -> Farmer {
        Farmer {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            username: self.username,
            password_hash: self.password_hash,
            language: self
                .language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            region: self.region,
            created_at: Utc::now(),
        }
    }
}

/// One stored conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

// ── Crops ─────────────────────────────────────────────────────────────────

/// A crop logged by a farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub id: String,
    pub farmer_id: String,
    #[serde(rename = "cropName")]
    pub crop_name: String,
    #[serde(rename = "plantingDate")]
    pub planting_date: NaiveDate,
}

impl Crop {
    /// Planting date the way an Indian-English locale prints it (`d/m/yyyy`).
    pub fn planted_on(&self) -> String {
        format_date_en_in(self.planting_date)
    }
}

#[derive(Debug, Clone)]
pub struct NewCrop {
    pub farmer_id: String,
    pub crop_name: String,
    pub planting_date: NaiveDate,
}

impl NewCrop {
    pub fn into_crop(self) -> Crop {
        Crop {
            id: Uuid::new_v4().to_string(),
            farmer_id: self.farmer_id,
            crop_name: self.crop_name.trim().to_string(),
            planting_date: self.planting_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CropUpdate {
    pub crop_name: String,
    pub planting_date: NaiveDate,
}

/// `d/m/yyyy` without zero padding.
pub fn format_date_en_in(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (browsers send either).
pub fn parse_planting_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

// ── Locations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// `[min_lon, min_lat, max_lon, max_lat]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn midpoint(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(b: [f64; 4]) -> Self {
        Self {
            min_lon: b[0],
            min_lat: b[1],
            max_lon: b[2],
            max_lat: b[3],
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}

// ── Snapshots ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentConditions>,

    /// Daily entries, today first
    #[serde(default)]
    pub forecast: Vec<DailyForecast>,

    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub wind_speed: f64,
    /// Unix seconds
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// `YYYY-MM-DD`
    pub date: String,
    pub temp_min: f64,
    pub temp_max: f64,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub top_prices: Vec<MarketPrice>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub commodity: String,
    pub mandi: String,
    /// Rupees per quintal, kept as the provider reports it
    pub modal_price: String,
}

/// Soil properties for the farmer's field.
///
/// SoilGrids fills `ph`/`soc`/`clay`; Bhuvan fills `ph`/`soc` plus the
/// descriptive profile fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSnapshot {
    pub ph: f64,
    /// Soil organic carbon, g/kg
    pub soc: f64,
    /// Clay fraction, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_farmer_defaults_language() {
        let farmer = NewFarmer {
            name: "Gurpreet".into(),
            username: "gurpreet".into(),
            password_hash: "hash".into(),
            region: "Punjab".into(),
            language: Some("  ".into()),
        }
        .into_farmer();
        assert_eq!(farmer.language, DEFAULT_LANGUAGE);
        assert!(!farmer.id.is_empty());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let farmer = NewFarmer {
            name: "Asha".into(),
            username: "asha".into(),
            password_hash: "$2b$10$secret".into(),
            region: "Bihar".into(),
            language: Some("hi-IN".into()),
        }
        .into_farmer();
        let json = serde_json::to_string(&farmer).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("hi-IN"));
    }

    #[test]
    fn en_in_date_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(format_date_en_in(date), "1/6/2025");
    }

    #[test]
    fn planting_date_accepts_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        assert_eq!(parse_planting_date("2025-11-03"), Some(expected));
        assert_eq!(parse_planting_date("2025-11-03T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_planting_date("03/11/2025"), None);
    }

    #[test]
    fn crop_uses_camel_case_wire_names() {
        let crop = NewCrop {
            farmer_id: "f1".into(),
            crop_name: "  Wheat ".into(),
            planting_date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
        }
        .into_crop();
        let json = serde_json::to_value(&crop).unwrap();
        assert_eq!(json["cropName"], "Wheat");
        assert_eq!(json["plantingDate"], "2025-11-03");
    }

    #[test]
    fn bounding_box_midpoint_and_wire_form() {
        let bbox: BoundingBox = serde_json::from_str("[75.0, 30.0, 76.0, 31.0]").unwrap();
        let mid = bbox.midpoint();
        assert!((mid.lon - 75.5).abs() < 1e-9);
        assert!((mid.lat - 30.5).abs() < 1e-9);
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[75.0,30.0,76.0,31.0]");
    }
}
