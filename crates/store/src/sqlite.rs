//! SQLite-backed farm store.
//!
//! Tables:
//! - `farmers` — accounts, unique by username
//! - `history` — conversation turns, ordered by an autoincrement `seq`
//! - `crops` — crops logged per farmer
//! - `snapshots` — one JSON payload per `(farmer_id, kind)`, upserted on sync

use agromind_core::error::StoreError;
use agromind_core::farm::{
    Crop, CropUpdate, Farmer, HistoryTurn, MarketSnapshot, NewCrop, NewFarmer, SoilSnapshot,
    WeatherSnapshot,
};
use agromind_core::message::Role;
use agromind_core::store::FarmStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshot kinds stored in the `snapshots` table.
const WEATHER: &str = "weather";
const MARKET: &str = "market";
const SOIL: &str = "soil";

/// Every connection to `:memory:` is its own database, so the in-memory
/// pool holds exactly one connection and never recycles it.
fn pool_options(url: &str) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    }
}

/// A SQLite farm store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database at `url`, e.g. `sqlite://agromind.db`.
    ///
    /// `sqlite::memory:` gives an ephemeral database on a single connection.
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = pool_options(url)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite farm store initialized at {url}");
        Ok(store)
    }

    /// Wrap an existing pool and run migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS farmers (
                id            TEXT PRIMARY KEY,
                username      TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                name          TEXT NOT NULL,
                language      TEXT NOT NULL,
                region        TEXT NOT NULL DEFAULT '',
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("farmers table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                seq        INTEGER PRIMARY KEY AUTOINCREMENT,
                farmer_id  TEXT NOT NULL REFERENCES farmers(id) ON DELETE CASCADE,
                role       TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("history table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_farmer ON history(farmer_id, seq)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("history index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crops (
                id            TEXT PRIMARY KEY,
                farmer_id     TEXT NOT NULL REFERENCES farmers(id) ON DELETE CASCADE,
                crop_name     TEXT NOT NULL,
                planting_date TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("crops table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                farmer_id    TEXT NOT NULL,
                kind         TEXT NOT NULL,
                payload      TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (farmer_id, kind)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("snapshots table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
    where
        T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
    {
        row.try_get(name)
            .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
    }

    fn row_to_farmer(row: &SqliteRow) -> Result<Farmer, StoreError> {
        let created_at: String = Self::column(row, "created_at")?;
        Ok(Farmer {
            id: Self::column(row, "id")?,
            name: Self::column(row, "name")?,
            username: Self::column(row, "username")?,
            password_hash: Self::column(row, "password_hash")?,
            language: Self::column(row, "language")?,
            region: Self::column(row, "region")?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn row_to_crop(row: &SqliteRow) -> Result<Crop, StoreError> {
        let planting_date: String = Self::column(row, "planting_date")?;
        Ok(Crop {
            id: Self::column(row, "id")?,
            farmer_id: Self::column(row, "farmer_id")?,
            crop_name: Self::column(row, "crop_name")?,
            planting_date: NaiveDate::parse_from_str(&planting_date, DATE_FORMAT).map_err(
                |e| StoreError::QueryFailed(format!("planting_date '{planting_date}': {e}")),
            )?,
        })
    }

    fn row_to_turn(row: &SqliteRow) -> Result<HistoryTurn, StoreError> {
        let role: String = Self::column(row, "role")?;
        Ok(HistoryTurn {
            role: Role::from_str(&role).map_err(StoreError::QueryFailed)?,
            content: Self::column(row, "content")?,
        })
    }

    async fn find_crop(&self, id: &str) -> Result<Option<Crop>, StoreError> {
        let row = sqlx::query("SELECT * FROM crops WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("find crop: {e}")))?;
        row.as_ref().map(Self::row_to_crop).transpose()
    }

    async fn upsert_snapshot<T: Serialize>(
        &self,
        farmer_id: &str,
        kind: &str,
        snapshot: &T,
        last_updated: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|e| StoreError::Storage(format!("{kind} snapshot serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO snapshots (farmer_id, kind, payload, last_updated)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(farmer_id, kind) DO UPDATE SET
                payload = excluded.payload,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(farmer_id)
        .bind(kind)
        .bind(&payload)
        .bind(last_updated.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("{kind} snapshot upsert: {e}")))?;

        debug!(farmer_id, kind, "Snapshot replaced");
        Ok(())
    }

    async fn load_snapshot<T: DeserializeOwned>(
        &self,
        farmer_id: &str,
        kind: &str,
    ) -> Result<Option<T>, StoreError> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM snapshots WHERE farmer_id = ?1 AND kind = ?2")
                .bind(farmer_id)
                .bind(kind)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("{kind} snapshot: {e}")))?;

        payload
            .map(|p| {
                serde_json::from_str(&p)
                    .map_err(|e| StoreError::QueryFailed(format!("{kind} snapshot payload: {e}")))
            })
            .transpose()
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl FarmStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_farmer(&self, farmer: NewFarmer) -> Result<Farmer, StoreError> {
        let farmer = farmer.into_farmer();

        sqlx::query(
            r#"
            INSERT INTO farmers (id, username, password_hash, name, language, region, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&farmer.id)
        .bind(&farmer.username)
        .bind(&farmer.password_hash)
        .bind(&farmer.name)
        .bind(&farmer.language)
        .bind(&farmer.region)
        .bind(farmer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("username '{}'", farmer.username))
            } else {
                StoreError::Storage(format!("INSERT farmer failed: {e}"))
            }
        })?;

        debug!(farmer_id = %farmer.id, "Farmer created");
        Ok(farmer)
    }

    async fn find_farmer(&self, id: &str) -> Result<Option<Farmer>, StoreError> {
        let row = sqlx::query("SELECT * FROM farmers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("find farmer: {e}")))?;
        row.as_ref().map(Self::row_to_farmer).transpose()
    }

    async fn find_farmer_by_username(&self, username: &str) -> Result<Option<Farmer>, StoreError> {
        let row = sqlx::query("SELECT * FROM farmers WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("find farmer by username: {e}")))?;
        row.as_ref().map(Self::row_to_farmer).transpose()
    }

    async fn recent_history(
        &self,
        farmer_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryTurn>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT role, content FROM (
                SELECT seq, role, content FROM history
                WHERE farmer_id = ?1
                ORDER BY seq DESC
                LIMIT ?2
            )
            ORDER BY seq ASC
            "#,
        )
        .bind(farmer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("recent history: {e}")))?;

        rows.iter().map(Self::row_to_turn).collect()
    }

    async fn append_history(
        &self,
        farmer_id: &str,
        turns: &[HistoryTurn],
        retain: Option<usize>,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin transaction: {e}")))?;

        let now = Utc::now().to_rfc3339();
        for turn in turns {
            sqlx::query(
                "INSERT INTO history (farmer_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(farmer_id)
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT history failed: {e}")))?;
        }

        if let Some(keep) = retain {
            let pruned = sqlx::query(
                r#"
                DELETE FROM history
                WHERE farmer_id = ?1 AND seq NOT IN (
                    SELECT seq FROM history WHERE farmer_id = ?1 ORDER BY seq DESC LIMIT ?2
                )
                "#,
            )
            .bind(farmer_id)
            .bind(keep as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("prune history failed: {e}")))?;

            if pruned.rows_affected() > 0 {
                debug!(farmer_id, pruned = pruned.rows_affected(), "History pruned");
            }
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit history: {e}")))
    }

    async fn history_len(&self, farmer_id: &str) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history WHERE farmer_id = ?1")
            .bind(farmer_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("history count: {e}")))?;
        Ok(count as usize)
    }

    async fn list_crops(&self, farmer_id: &str) -> Result<Vec<Crop>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM crops WHERE farmer_id = ?1 ORDER BY planting_date DESC, rowid ASC",
        )
        .bind(farmer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("list crops: {e}")))?;

        rows.iter().map(Self::row_to_crop).collect()
    }

    async fn create_crop(&self, crop: NewCrop) -> Result<Crop, StoreError> {
        let crop = crop.into_crop();

        sqlx::query(
            "INSERT INTO crops (id, farmer_id, crop_name, planting_date) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&crop.id)
        .bind(&crop.farmer_id)
        .bind(&crop.crop_name)
        .bind(crop.planting_date.format(DATE_FORMAT).to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("INSERT crop failed: {e}")))?;

        Ok(crop)
    }

    async fn update_crop(&self, id: &str, update: CropUpdate) -> Result<Option<Crop>, StoreError> {
        let result =
            sqlx::query("UPDATE crops SET crop_name = ?1, planting_date = ?2 WHERE id = ?3")
                .bind(update.crop_name.trim())
                .bind(update.planting_date.format(DATE_FORMAT).to_string())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Storage(format!("UPDATE crop failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_crop(id).await
    }

    async fn delete_crop(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM crops WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE crop failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn weather(&self, farmer_id: &str) -> Result<Option<WeatherSnapshot>, StoreError> {
        self.load_snapshot(farmer_id, WEATHER).await
    }

    async fn upsert_weather(
        &self,
        farmer_id: &str,
        snapshot: WeatherSnapshot,
    ) -> Result<WeatherSnapshot, StoreError> {
        self.upsert_snapshot(farmer_id, WEATHER, &snapshot, snapshot.last_updated)
            .await?;
        Ok(snapshot)
    }

    async fn market(&self, farmer_id: &str) -> Result<Option<MarketSnapshot>, StoreError> {
        self.load_snapshot(farmer_id, MARKET).await
    }

    async fn upsert_market(
        &self,
        farmer_id: &str,
        snapshot: MarketSnapshot,
    ) -> Result<MarketSnapshot, StoreError> {
        self.upsert_snapshot(farmer_id, MARKET, &snapshot, snapshot.last_updated)
            .await?;
        Ok(snapshot)
    }

    async fn soil(&self, farmer_id: &str) -> Result<Option<SoilSnapshot>, StoreError> {
        self.load_snapshot(farmer_id, SOIL).await
    }

    async fn upsert_soil(
        &self,
        farmer_id: &str,
        snapshot: SoilSnapshot,
    ) -> Result<SoilSnapshot, StoreError> {
        self.upsert_snapshot(farmer_id, SOIL, &snapshot, snapshot.last_updated)
            .await?;
        Ok(snapshot)
    }
}
