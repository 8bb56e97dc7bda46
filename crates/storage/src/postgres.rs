//! PostgreSQL-backed region cache (`region_entries` table).

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use dex_core::config::PostgresConfig;
use dex_core::{DexId, RegionEntry, RegionPage, VarietyInfo};

use crate::error::StoreError;
use crate::RegionStore;

pub struct PgRegionStore {
    pool: PgPool,
}

impl PgRegionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the configured pool size and apply pending migrations.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await?;
        info!(host = %config.host, db = %config.database, "PostgreSQL connected");

        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("region cache migrations applied");

        Ok(Self::new(pool))
    }
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<RegionEntry, StoreError> {
    let dex_id: i32 = row.try_get("dex_id")?;
    let dex_id = DexId::try_from(dex_id).map_err(|_| StoreError::DexIdOutOfRange(dex_id.into()))?;
    let types: Json<Vec<String>> = row.try_get("types")?;
    let forms: Json<Vec<VarietyInfo>> = row.try_get("forms")?;
    Ok(RegionEntry {
        region: row.try_get("region")?,
        dex_id,
        name: row.try_get("name")?,
        types: types.0,
        sprite: row.try_get("sprite")?,
        forms: forms.0,
    })
}

#[async_trait]
impl RegionStore for PgRegionStore {
    async fn upsert_entry(&self, mut entry: RegionEntry) -> Result<(), StoreError> {
        entry.dedupe_forms();
        let dex_id = i32::try_from(entry.dex_id)
            .map_err(|_| StoreError::DexIdOutOfRange(entry.dex_id.into()))?;
        sqlx::query(
            "INSERT INTO region_entries (region, dex_id, name, types, sprite, forms, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             ON CONFLICT (region, dex_id) DO UPDATE SET \
             name = EXCLUDED.name, types = EXCLUDED.types, sprite = EXCLUDED.sprite, \
             forms = EXCLUDED.forms, updated_at = EXCLUDED.updated_at",
        )
        .bind(&entry.region)
        .bind(dex_id)
        .bind(&entry.name)
        .bind(Json(&entry.types))
        .bind(&entry.sprite)
        .bind(Json(&entry.forms))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_by_region(&self, region: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM region_entries WHERE region = $1")
            .bind(region)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn clear_region(&self, region: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM region_entries WHERE region = $1")
            .bind(region)
            .execute(&self.pool)
            .await?;
        debug!(region, removed = result.rows_affected(), "cleared cached region");
        Ok(result.rows_affected())
    }

    async fn page(&self, region: &str, limit: u32, offset: u64) -> Result<RegionPage, StoreError> {
        // Count and slice are separate statements; rows landing in between is acceptable.
        let total = self.count_by_region(region).await?;
        let rows = sqlx::query(
            "SELECT region, dex_id, name, types, sprite, forms \
             FROM region_entries WHERE region = $1 \
             ORDER BY dex_id ASC LIMIT $2 OFFSET $3",
        )
        .bind(region)
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let results = rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()?;
        Ok(RegionPage::new(results, total, offset, limit))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
