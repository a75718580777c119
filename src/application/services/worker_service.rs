use crate::application::ports::{PositionProvider, WorkerDirectory};
use crate::application::services::location_tracker::LocationTracker;
use crate::domain::entities::{WorkerRegistration, WorkerSummary};
use crate::domain::value_objects::{Coordinates, WorkerId};
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Worker registration and the cached team roster.
pub struct WorkerService {
    directory: Arc<dyn WorkerDirectory>,
    tracker: Arc<LocationTracker>,
    positions: Arc<dyn PositionProvider>,
    fix_timeout: Duration,
    roster: RwLock<Vec<WorkerSummary>>,
    current: RwLock<Option<WorkerId>>,
}

impl WorkerService {
    pub fn new(
        directory: Arc<dyn WorkerDirectory>,
        tracker: Arc<LocationTracker>,
        positions: Arc<dyn PositionProvider>,
        fix_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            tracker,
            positions,
            fix_timeout,
            roster: RwLock::new(Vec::new()),
            current: RwLock::new(None),
        }
    }

    /// Registers a new worker under a fresh id and queues its first position. Waits at most
    /// `fix_timeout` for a fix, then uses `fallback` (the map view centre).
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        fallback: Coordinates,
    ) -> Result<WorkerRegistration, AppError> {
        let registration = WorkerRegistration::new(WorkerId::generate(), name, email)
            .map_err(AppError::ValidationError)?;

        let position = match tokio::time::timeout(self.fix_timeout, self.positions.next_fix()).await
        {
            Ok(Ok(position)) => position,
            Ok(Err(err)) => {
                tracing::warn!(target: "team::workers", error = %err, "position fix failed; using map centre");
                fallback
            }
            Err(_) => {
                tracing::debug!(
                    target: "team::workers",
                    timeout_ms = self.fix_timeout.as_millis() as u64,
                    "no position fix in time; using map centre"
                );
                fallback
            }
        };

        self.directory.register(&registration).await?;
        *self.current.write().await = Some(registration.worker_id.clone());
        self.tracker
            .record(&registration.worker_id, position)
            .await?;

        tracing::info!(
            target: "team::workers",
            worker_id = %registration.worker_id,
            "worker registered"
        );
        Ok(registration)
    }

    pub async fn refresh_workers(&self) -> Result<Vec<WorkerSummary>, AppError> {
        let workers = self.directory.list_workers().await?;
        tracing::debug!(target: "team::workers", count = workers.len(), "worker roster refreshed");
        *self.roster.write().await = workers.clone();
        Ok(workers)
    }

    pub async fn roster(&self) -> Vec<WorkerSummary> {
        self.roster.read().await.clone()
    }

    pub async fn current_worker(&self) -> Option<WorkerId> {
        self.current.read().await.clone()
    }
}
