use crate::domain::value_objects::CacheKey;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Remembers the last activated base layer across restarts.
#[async_trait]
pub trait LayerPreferences: Send + Sync {
    async fn active_layer(&self) -> Result<Option<CacheKey>, AppError>;
    async fn set_active_layer(&self, key: &CacheKey) -> Result<(), AppError>;
    async fn clear_active_layer(&self) -> Result<(), AppError>;
}
