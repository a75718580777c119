use crate::domain::entities::PendingUpdate;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Remote endpoint accepting queued location samples.
#[async_trait]
pub trait LocationSink: Send + Sync {
    /// `Ok` only when the remote acknowledged the sample.
    async fn deliver(&self, update: &PendingUpdate) -> Result<(), AppError>;
}
