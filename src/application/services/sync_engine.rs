use crate::application::ports::{LocationSink, PendingUpdateQueue};
use crate::domain::entities::{PendingUpdate, SyncResult};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub pending_count: u32,
    pub last_sync: Option<i64>,
    pub last_sweep: Option<i64>,
    pub sync_errors: u32,
}

/// Drains the pending-update queue into the remote sink.
///
/// Whole flushes are serialized behind `gate`: an invocation that arrives while another is
/// running waits, then works from a fresh snapshot, so an entry is never in flight twice.
pub struct SyncEngine {
    queue: Arc<dyn PendingUpdateQueue>,
    sink: Arc<dyn LocationSink>,
    retention: Duration,
    gate: Mutex<()>,
    status: Arc<RwLock<SyncStatus>>,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn PendingUpdateQueue>,
        sink: Arc<dyn LocationSink>,
        retention: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            sink,
            retention,
            gate: Mutex::new(()),
            status: Arc::new(RwLock::new(SyncStatus::default())),
        })
    }

    /// Fire-and-forget flush. Failures are logged; entries stay queued.
    pub fn trigger(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.flush_logged().await;
        });
    }

    /// Flushes, logging a failure at warn instead of returning it.
    pub async fn flush_logged(&self) -> Option<SyncResult> {
        match self.flush().await {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(target: "offline::sync", error = %err, "flush failed");
                None
            }
        }
    }

    pub async fn flush(&self) -> Result<SyncResult, AppError> {
        let _guard = self.gate.lock().await;
        self.status.write().await.is_syncing = true;

        let result = self.flush_locked().await;

        let mut status = self.status.write().await;
        status.is_syncing = false;
        match &result {
            Ok(outcome) => {
                status.last_sync = Some(Utc::now().timestamp_millis());
                status.pending_count = outcome.pending_count;
                status.sync_errors = status.sync_errors.saturating_add(outcome.failed_count);
            }
            Err(_) => status.sync_errors = status.sync_errors.saturating_add(1),
        }
        result
    }

    async fn flush_locked(&self) -> Result<SyncResult, AppError> {
        // Snapshot first: delivery and mark_synced must not interleave with an open cursor.
        let pending: Vec<PendingUpdate> = self.queue.list_unsynced().try_collect().await?;
        if pending.is_empty() {
            return Ok(SyncResult::default());
        }

        let mut synced = 0u32;
        let mut failed = 0u32;
        for update in &pending {
            match self.deliver_one(update).await {
                Ok(()) => synced += 1,
                Err(err) => {
                    failed += 1;
                    tracing::debug!(
                        target: "offline::sync",
                        update_id = %update.id,
                        error = %err,
                        "location delivery failed; left queued"
                    );
                }
            }
        }

        let remaining = self.queue.count_unsynced().await?;
        let result = SyncResult::new(synced, failed, remaining.min(u64::from(u32::MAX)) as u32);
        tracing::info!(
            target: "offline::sync",
            synced = result.synced_count,
            failed = result.failed_count,
            pending = result.pending_count,
            "location flush completed"
        );
        Ok(result)
    }

    async fn deliver_one(&self, update: &PendingUpdate) -> Result<(), AppError> {
        self.sink.deliver(update).await?;
        if !self.queue.mark_synced(update.id).await? {
            tracing::warn!(
                target: "offline::sync",
                update_id = %update.id,
                "entry was already marked synced"
            );
        }
        Ok(())
    }

    /// Deletes synced entries older than the retention window.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let removed = self.queue.sweep_expired(self.retention, now).await?;
        self.status.write().await.last_sweep = Some(now.timestamp_millis());
        tracing::info!(
            target: "offline::sync",
            removed,
            retention_secs = self.retention.as_secs(),
            "retention sweep completed"
        );
        Ok(removed)
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub async fn get_status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }
}
