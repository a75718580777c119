use crate::domain::entities::ArchiveRecord;
use crate::domain::value_objects::CacheKey;
use crate::shared::error::AppError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Durable key → archive storage.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Insert or fully replace the record stored under `key`.
    async fn put(&self, key: &CacheKey, record: &ArchiveRecord) -> Result<(), AppError>;

    /// Fails with `AppError::NotFound` when nothing is stored under `key`.
    async fn get(&self, key: &CacheKey) -> Result<ArchiveRecord, AppError>;

    /// Removing an absent key is not an error.
    async fn delete(&self, key: &CacheKey) -> Result<(), AppError>;

    async fn contains(&self, key: &CacheKey) -> Result<bool, AppError>;

    /// Streams every stored archive. Records written concurrently may or may not appear.
    fn list_all(&self) -> BoxStream<'_, Result<(CacheKey, ArchiveRecord), AppError>>;
}
