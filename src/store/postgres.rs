use crate::error::StoreError;
use crate::models::OutageRecord;
use crate::store::{InsertReport, OutageStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS water_outages (
        id BIGSERIAL PRIMARY KEY,
        community TEXT NOT NULL CHECK (community <> ''),
        updated_time TEXT NOT NULL DEFAULT '',
        priority TEXT NOT NULL DEFAULT '',
        current_status TEXT NOT NULL DEFAULT '',
        repair_location TEXT NOT NULL DEFAULT '',
        repair_completion TEXT NOT NULL DEFAULT '',
        water_wagon_info TEXT NOT NULL DEFAULT '',
        scraped_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

#[derive(Debug, Clone, FromRow)]
struct OutageRow {
    community: String,
    updated_time: String,
    priority: String,
    current_status: String,
    repair_location: String,
    repair_completion: String,
    water_wagon_info: String,
    scraped_at: DateTime<Utc>,
}

impl From<OutageRow> for OutageRecord {
    fn from(row: OutageRow) -> Self {
        Self {
            community: row.community,
            updated_time: row.updated_time,
            priority: row.priority,
            current_status: row.current_status,
            repair_location: row.repair_location,
            repair_completion: row.repair_completion,
            water_wagon_info: row.water_wagon_info,
            scraped_at: row.scraped_at,
        }
    }
}

/// Outage store backed by the `water_outages` table
#[derive(Clone)]
pub struct PgOutageStore {
    pool: PgPool,
}

impl PgOutageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the table exists
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!("Outage table ready");

        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_one(&self, record: &OutageRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO water_outages
                (community, updated_time, priority, current_status,
                 repair_location, repair_completion, water_wagon_info, scraped_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&record.community)
        .bind(&record.updated_time)
        .bind(&record.priority)
        .bind(&record.current_status)
        .bind(&record.repair_location)
        .bind(&record.repair_completion)
        .bind(&record.water_wagon_info)
        .bind(record.scraped_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OutageStore for PgOutageStore {
    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM water_outages")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_many(&self, records: Vec<OutageRecord>) -> Result<InsertReport, StoreError> {
        let mut report = InsertReport::default();

        for record in &records {
            match self.insert_one(record).await {
                Ok(()) => report.inserted += 1,
                Err(e) => {
                    warn!(community = %record.community, "Failed to insert outage: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<OutageRecord>, StoreError> {
        let rows = sqlx::query_as::<_, OutageRow>(
            r#"
            SELECT community, updated_time, priority, current_status,
                   repair_location, repair_completion, water_wagon_info, scraped_at
            FROM water_outages
            WHERE scraped_at >= $1
            ORDER BY id
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OutageRecord::from).collect())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
