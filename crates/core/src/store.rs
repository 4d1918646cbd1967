//! FarmStore trait — the repository interface over farmer data.
//!
//! Implementations: SQLite (production) and in-memory (tests, demos).
//! Snapshot writes are upserts keyed by farmer; history writes are
//! append-only and atomic so concurrent queries cannot drop turns.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::farm::{
    Crop, CropUpdate, Farmer, HistoryTurn, MarketSnapshot, NewCrop, NewFarmer, SoilSnapshot,
    WeatherSnapshot,
};

#[async_trait]
pub trait FarmStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    // --- Farmers ---

    /// Insert a farmer. Fails with [`StoreError::Duplicate`] if the username is taken.
    async fn create_farmer(&self, farmer: NewFarmer) -> Result<Farmer, StoreError>;

    async fn find_farmer(&self, id: &str) -> Result<Option<Farmer>, StoreError>;

    async fn find_farmer_by_username(&self, username: &str)
    -> Result<Option<Farmer>, StoreError>;

    // --- History ---

    /// The last `limit` turns, oldest first.
    async fn recent_history(
        &self,
        farmer_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryTurn>, StoreError>;

    /// Append turns in order as one atomic operation.
    ///
    /// When `retain` is `Some(n)`, only the newest `n` turns survive.
    async fn append_history(
        &self,
        farmer_id: &str,
        turns: &[HistoryTurn],
        retain: Option<usize>,
    ) -> Result<(), StoreError>;

    async fn history_len(&self, farmer_id: &str) -> Result<usize, StoreError>;

    // --- Crops ---

    /// All crops for a farmer, newest planting date first.
    async fn list_crops(&self, farmer_id: &str) -> Result<Vec<Crop>, StoreError>;

    async fn create_crop(&self, crop: NewCrop) -> Result<Crop, StoreError>;

    async fn update_crop(&self, id: &str, update: CropUpdate)
    -> Result<Option<Crop>, StoreError>;

    async fn delete_crop(&self, id: &str) -> Result<bool, StoreError>;

    // --- Snapshots (one per farmer per kind) ---

    async fn weather(&self, farmer_id: &str) -> Result<Option<WeatherSnapshot>, StoreError>;

    async fn upsert_weather(
        &self,
        farmer_id: &str,
        snapshot: WeatherSnapshot,
    ) -> Result<WeatherSnapshot, StoreError>;

    async fn market(&self, farmer_id: &str) -> Result<Option<MarketSnapshot>, StoreError>;

    async fn upsert_market(
        &self,
        farmer_id: &str,
        snapshot: MarketSnapshot,
    ) -> Result<MarketSnapshot, StoreError>;

    async fn soil(&self, farmer_id: &str) -> Result<Option<SoilSnapshot>, StoreError>;

    async fn upsert_soil(
        &self,
        farmer_id: &str,
        snapshot: SoilSnapshot,
    ) -> Result<SoilSnapshot, StoreError>;
}
