//! # AgroMind Core
//!
//! Domain types, traits, and error definitions for the AgroMind
//! farmer-advisory backend. This crate has **zero framework dependencies**:
//! it defines the model that every other crate implements against.
//!
//! ## Seams
//!
//! - [`FarmStore`] — persistence of farmers, crops, snapshots and history
//! - [`Provider`] — the language-model chat endpoint
//! - [`DataSource`] — one upstream weather/market/soil provider
//!
//! Implementations live in their own crates so the store, the model
//! provider and the upstream adapters can be swapped without touching the
//! advisory pipeline.

pub mod error;
pub mod farm;
pub mod message;
pub mod provider;
pub mod source;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, UpstreamError};
pub use farm::{
    BoundingBox, Crop, CropUpdate, CurrentConditions, DailyForecast, Farmer, GeoPoint,
    HistoryTurn, MarketPrice, MarketSnapshot, NewCrop, NewFarmer, SoilSnapshot, WeatherSnapshot,
};
pub use message::{ImageAttachment, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use source::{DataSource, MarketSource, SoilSource, WeatherSource};
pub use store::FarmStore;
