use crate::domain::value_objects::Coordinates;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Resolves with the current position, waiting for a first fix when none is known yet.
    /// May wait indefinitely; callers bound it.
    async fn next_fix(&self) -> Result<Coordinates, AppError>;
}
