use super::queries::{DELETE_PREFERENCE, SELECT_PREFERENCE, UPSERT_PREFERENCE};
use crate::application::ports::LayerPreferences;
use crate::domain::constants::ACTIVE_LAYER_PREFERENCE;
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;

#[derive(Clone)]
pub struct SqliteLayerPreferences {
    pool: ConnectionPool,
}

impl SqliteLayerPreferences {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LayerPreferences for SqliteLayerPreferences {
    async fn active_layer(&self) -> Result<Option<CacheKey>, AppError> {
        let value: Option<String> = sqlx::query_scalar(SELECT_PREFERENCE)
            .bind(ACTIVE_LAYER_PREFERENCE)
            .fetch_optional(self.pool.get_pool())
            .await?;

        // a blank value is treated as "nothing remembered"
        Ok(value.and_then(|v| CacheKey::new(v).ok()))
    }

    async fn set_active_layer(&self, key: &CacheKey) -> Result<(), AppError> {
        sqlx::query(UPSERT_PREFERENCE)
            .bind(ACTIVE_LAYER_PREFERENCE)
            .bind(key.as_str())
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn clear_active_layer(&self) -> Result<(), AppError> {
        sqlx::query(DELETE_PREFERENCE)
            .bind(ACTIVE_LAYER_PREFERENCE)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}
