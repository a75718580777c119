use super::queries::{
    COUNT_UNSYNCED_UPDATES, DELETE_EXPIRED_UPDATES, INSERT_PENDING_UPDATE, MARK_UPDATE_SYNCED,
    SELECT_UNSYNCED_UPDATES,
};
use super::rows::PendingUpdateRow;
use crate::application::ports::PendingUpdateQueue;
use crate::domain::entities::{PendingUpdate, PendingUpdateDraft};
use crate::domain::value_objects::PendingUpdateId;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use std::time::Duration;

#[derive(Clone)]
pub struct SqlitePendingUpdateQueue {
    pool: ConnectionPool,
}

impl SqlitePendingUpdateQueue {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingUpdateQueue for SqlitePendingUpdateQueue {
    async fn enqueue(&self, draft: PendingUpdateDraft) -> Result<PendingUpdate, AppError> {
        let result = sqlx::query(INSERT_PENDING_UPDATE)
            .bind(draft.worker_id.as_str())
            .bind(draft.position.latitude())
            .bind(draft.position.longitude())
            .bind(draft.timestamp.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;

        let id = PendingUpdateId::new(result.last_insert_rowid()).map_err(AppError::Storage)?;
        tracing::trace!(
            target: "offline::sync",
            update_id = %id,
            worker_id = %draft.worker_id,
            "location queued"
        );

        Ok(PendingUpdate {
            id,
            worker_id: draft.worker_id,
            position: draft.position,
            timestamp: draft.timestamp,
            synced: false,
            synced_at: None,
        })
    }

    fn list_unsynced(&self) -> BoxStream<'_, Result<PendingUpdate, AppError>> {
        sqlx::query_as::<_, PendingUpdateRow>(SELECT_UNSYNCED_UPDATES)
            .fetch(self.pool.get_pool())
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(PendingUpdateRow::into_domain)
            })
            .boxed()
    }

    async fn mark_synced(&self, id: PendingUpdateId) -> Result<bool, AppError> {
        let result = sqlx::query(MARK_UPDATE_SYNCED)
            .bind(Utc::now().timestamp_millis())
            .bind(id.value())
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sweep_expired(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| AppError::ValidationError(format!("Invalid retention window: {e}")))?;
        let cutoff = now - retention;

        let result = sqlx::query(DELETE_EXPIRED_UPDATES)
            .bind(cutoff.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_unsynced(&self) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar(COUNT_UNSYNCED_UPDATES)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count.max(0) as u64)
    }
}
