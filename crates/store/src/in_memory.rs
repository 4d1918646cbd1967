//! In-memory store — useful for testing and throwaway demo servers.

use agromind_core::error::StoreError;
use agromind_core::farm::{
    Crop, CropUpdate, Farmer, HistoryTurn, MarketSnapshot, NewCrop, NewFarmer, SoilSnapshot,
    WeatherSnapshot,
};
use agromind_core::store::FarmStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    farmers: HashMap<String, Farmer>,
    history: HashMap<String, Vec<HistoryTurn>>,
    crops: Vec<Crop>,
    weather: HashMap<String, WeatherSnapshot>,
    market: HashMap<String, MarketSnapshot>,
    soil: HashMap<String, SoilSnapshot>,
}

/// A store that keeps every table behind one lock.
/// Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FarmStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create_farmer(&self, farmer: NewFarmer) -> Result<Farmer, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.farmers.values().any(|f| f.username == farmer.username) {
            return Err(StoreError::Duplicate(format!(
                "username '{}'",
                farmer.username
            )));
        }
        let farmer = farmer.into_farmer();
        tables.farmers.insert(farmer.id.clone(), farmer.clone());
        Ok(farmer)
    }

    async fn find_farmer(&self, id: &str) -> Result<Option<Farmer>, StoreError> {
        Ok(self.tables.read().await.farmers.get(id).cloned())
    }

    async fn find_farmer_by_username(&self, username: &str) -> Result<Option<Farmer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .farmers
            .values()
            .find(|f| f.username == username)
            .cloned())
    }

    async fn recent_history(
        &self,
        farmer_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryTurn>, StoreError> {
        let tables = self.tables.read().await;
        let turns = tables.history.get(farmer_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }

    async fn append_history(
        &self,
        farmer_id: &str,
        turns: &[HistoryTurn],
        retain: Option<usize>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.farmers.contains_key(farmer_id) {
            return Err(StoreError::QueryFailed(format!("unknown farmer '{farmer_id}'")));
        }
        let history = tables.history.entry(farmer_id.to_string()).or_default();
        history.extend_from_slice(turns);
        if let Some(keep) = retain {
            let excess = history.len().saturating_sub(keep);
            history.drain(..excess);
        }
        Ok(())
    }

    async fn history_len(&self, farmer_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .history
            .get(farmer_id)
            .map_or(0, Vec::len))
    }

    async fn list_crops(&self, farmer_id: &str) -> Result<Vec<Crop>, StoreError> {
        let tables = self.tables.read().await;
        let mut crops: Vec<Crop> = tables
            .crops
            .iter()
            .filter(|c| c.farmer_id == farmer_id)
            .cloned()
            .collect();
        crops.sort_by(|a, b| b.planting_date.cmp(&a.planting_date));
        Ok(crops)
    }

    async fn create_crop(&self, crop: NewCrop) -> Result<Crop, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.farmers.contains_key(&crop.farmer_id) {
            return Err(StoreError::QueryFailed(format!(
                "unknown farmer '{}'",
                crop.farmer_id
            )));
        }
        let crop = crop.into_crop();
        tables.crops.push(crop.clone());
        Ok(crop)
    }

    async fn update_crop(&self, id: &str, update: CropUpdate) -> Result<Option<Crop>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.crops.iter_mut().find(|c| c.id == id).map(|crop| {
            crop.crop_name = update.crop_name.trim().to_string();
            crop.planting_date = update.planting_date;
            crop.clone()
        }))
    }

    async fn delete_crop(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let len_before = tables.crops.len();
        tables.crops.retain(|c| c.id != id);
        Ok(tables.crops.len() < len_before)
    }

    async fn weather(&self, farmer_id: &str) -> Result<Option<WeatherSnapshot>, StoreError> {
        Ok(self.tables.read().await.weather.get(farmer_id).cloned())
    }

    async fn upsert_weather(
        &self,
        farmer_id: &str,
        snapshot: WeatherSnapshot,
    ) -> Result<WeatherSnapshot, StoreError> {
        let mut tables = self.tables.write().await;
        tables.weather.insert(farmer_id.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    async fn market(&self, farmer_id: &str) -> Result<Option<MarketSnapshot>, StoreError> {
        Ok(self.tables.read().await.market.get(farmer_id).cloned())
    }

    async fn upsert_market(
        &self,
        farmer_id: &str,
        snapshot: MarketSnapshot,
    ) -> Result<MarketSnapshot, StoreError> {
        let mut tables = self.tables.write().await;
        tables.market.insert(farmer_id.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    async fn soil(&self, farmer_id: &str) -> Result<Option<SoilSnapshot>, StoreError> {
        Ok(self.tables.read().await.soil.get(farmer_id).cloned())
    }

    async fn upsert_soil(
        &self,
        farmer_id: &str,
        snapshot: SoilSnapshot,
    ) -> Result<SoilSnapshot, StoreError> {
        let mut tables = self.tables.write().await;
        tables.soil.insert(farmer_id.to_string(), snapshot.clone());
        Ok(snapshot)
    }
}
