use crate::domain::entities::{PendingUpdate, PendingUpdateDraft};
use crate::domain::value_objects::PendingUpdateId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::time::Duration;

/// Append-only queue of location samples awaiting delivery.
#[async_trait]
pub trait PendingUpdateQueue: Send + Sync {
    async fn enqueue(&self, draft: PendingUpdateDraft) -> Result<PendingUpdate, AppError>;

    /// Unsynced entries in enqueue order.
    fn list_unsynced(&self) -> BoxStream<'_, Result<PendingUpdate, AppError>>;

    /// Returns `true` when this call flipped the flag, `false` when it was already set.
    async fn mark_synced(&self, id: PendingUpdateId) -> Result<bool, AppError>;

    /// Deletes synced entries whose timestamp is older than `now - retention`.
    async fn sweep_expired(&self, retention: Duration, now: DateTime<Utc>)
    -> Result<u64, AppError>;

    async fn count_unsynced(&self) -> Result<u64, AppError>;
}
