use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use super::models::Reading;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append-only archive of raw readings.
///
/// Implementations must accept the same `reading.id` more than once: under
/// at-least-once delivery a redelivered message is archived again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn add(&self, reading: &Reading) -> Result<(), StoreError>;
}

/// [`HistoryStore`] backed by the `sensor_data_history` table.
#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn add(&self, reading: &Reading) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sensor_data_history
                (reading_id, field_id, sensor_type, value, measured_at,
                 sensor_device_id, farmer_name, property_name, field_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(reading.id)
        .bind(reading.field_id)
        .bind(reading.sensor_type.as_str())
        .bind(reading.value)
        .bind(reading.timestamp)
        .bind(reading.sensor_device_id)
        .bind(&reading.farmer_name)
        .bind(&reading.property_name)
        .bind(&reading.field_name)
        .execute(&self.pool)
        .await?;

        debug!(reading_id = %reading.id, "Reading archived");
        Ok(())
    }
}
