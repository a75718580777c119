use crate::domain::entities::ArchiveInfo;
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;

/// Remote host of tile archives.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Reads only the header and metadata block. Transport failures are
    /// `AppError::Unreachable`, unreadable metadata is `AppError::ValidationError`.
    async fn inspect(&self, url: &str) -> Result<ArchiveInfo, AppError>;

    /// Fetches the complete archive. Non-success statuses are `AppError::Network`.
    async fn download(&self, url: &str) -> Result<Bytes, AppError>;
}
