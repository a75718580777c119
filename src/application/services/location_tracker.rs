use crate::application::ports::{PendingUpdateQueue, PositionProvider};
use crate::application::services::sync_engine::SyncEngine;
use crate::domain::entities::{PendingUpdate, PendingUpdateDraft};
use crate::domain::value_objects::{Coordinates, WorkerId};
use crate::infrastructure::network::ConnectivityMonitor;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

/// Entry point for raw position fixes from the device.
pub struct LocationTracker {
    queue: Arc<dyn PendingUpdateQueue>,
    engine: Arc<SyncEngine>,
    connectivity: ConnectivityMonitor,
    auto_sync: bool,
    last_fix: watch::Sender<Option<Coordinates>>,
}

impl LocationTracker {
    pub fn new(
        queue: Arc<dyn PendingUpdateQueue>,
        engine: Arc<SyncEngine>,
        connectivity: ConnectivityMonitor,
        auto_sync: bool,
    ) -> Self {
        let (last_fix, _rx) = watch::channel(None);
        Self {
            queue,
            engine,
            connectivity,
            auto_sync,
            last_fix,
        }
    }

    /// Queues the sample regardless of connectivity, then kicks off a background flush when
    /// online. Only invalid coordinates or a storage failure are reported.
    pub async fn on_fix(
        &self,
        worker_id: &WorkerId,
        latitude: f64,
        longitude: f64,
    ) -> Result<PendingUpdate, AppError> {
        let position =
            Coordinates::new(latitude, longitude).map_err(AppError::ValidationError)?;
        self.record(worker_id, position).await
    }

    pub(crate) async fn record(
        &self,
        worker_id: &WorkerId,
        position: Coordinates,
    ) -> Result<PendingUpdate, AppError> {
        let draft = PendingUpdateDraft::new(worker_id.clone(), position, Utc::now());
        let update = self.queue.enqueue(draft).await?;
        self.last_fix.send_replace(Some(position));

        if self.auto_sync && self.connectivity.is_online() {
            self.engine.trigger();
        }
        Ok(update)
    }

    pub fn last_fix(&self) -> Option<Coordinates> {
        *self.last_fix.borrow()
    }
}

#[async_trait]
impl PositionProvider for LocationTracker {
    /// The current fix when one is known, otherwise the next one recorded.
    async fn next_fix(&self) -> Result<Coordinates, AppError> {
        let mut rx = self.last_fix.subscribe();
        if let Some(position) = *rx.borrow_and_update() {
            return Ok(position);
        }
        loop {
            rx.changed()
                .await
                .map_err(|_| AppError::Internal("position feed closed".to_string()))?;
            if let Some(position) = *rx.borrow_and_update() {
                return Ok(position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::LocationSink;
    use crate::infrastructure::database::ConnectionPool;
    use crate::infrastructure::storage::SqlitePendingUpdateQueue;
    use std::time::Duration;

    struct OfflineSink;

    #[async_trait]
    impl LocationSink for OfflineSink {
        async fn deliver(&self, _update: &PendingUpdate) -> Result<(), AppError> {
            Err(AppError::Network("offline".into()))
        }
    }

    async fn setup(online: bool) -> (Arc<LocationTracker>, Arc<SqlitePendingUpdateQueue>) {
        let pool = ConnectionPool::from_memory().await.expect("pool");
        pool.migrate().await.expect("migrate");
        let queue = Arc::new(SqlitePendingUpdateQueue::new(pool));
        let engine = SyncEngine::new(queue.clone(), Arc::new(OfflineSink), Duration::from_secs(60));
        let tracker = Arc::new(LocationTracker::new(
            queue.clone(),
            engine,
            ConnectivityMonitor::new(online),
            true,
        ));
        (tracker, queue)
    }

    #[tokio::test]
    async fn fix_is_queued_even_when_delivery_fails() {
        let (tracker, queue) = setup(true).await;
        let worker = WorkerId::new("w-9".into()).unwrap();

        let update = tracker.on_fix(&worker, 44.5, -72.3).await.expect("queued");
        assert!(!update.synced);
        assert_eq!(tracker.last_fix(), Some(Coordinates::new(44.5, -72.3).unwrap()));

        // give the spawned flush a chance to run and fail
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.count_unsynced().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_fix_is_rejected_without_queueing() {
        let (tracker, queue) = setup(false).await;
        let worker = WorkerId::new("w-9".into()).unwrap();

        let err = tracker.on_fix(&worker, 120.0, 0.0).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(queue.count_unsynced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn next_fix_resolves_on_the_following_sample() {
        let (tracker, _queue) = setup(false).await;
        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.next_fix().await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let worker = WorkerId::new("w-9".into()).unwrap();
        tracker.on_fix(&worker, 10.0, 20.0).await.unwrap();

        let fix = waiter.await.unwrap().unwrap();
        assert_eq!(fix, Coordinates::new(10.0, 20.0).unwrap());
    }

    #[tokio::test]
    async fn next_fix_returns_known_position_immediately() {
        let (tracker, _queue) = setup(false).await;
        let worker = WorkerId::new("w-9".into()).unwrap();
        tracker.on_fix(&worker, 46.0, -71.0).await.unwrap();

        let fix = tokio::time::timeout(Duration::ZERO, tracker.next_fix())
            .await
            .expect("no wait for a known fix")
            .unwrap();
        assert_eq!(fix, Coordinates::new(46.0, -71.0).unwrap());
    }
}
