use crate::domain::entities::{WorkerRegistration, WorkerSummary};
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    async fn register(&self, registration: &WorkerRegistration) -> Result<(), AppError>;

    /// An empty roster is `Ok(vec![])`, not an error.
    async fn list_workers(&self) -> Result<Vec<WorkerSummary>, AppError>;
}
