use crate::domain::value_objects::{Coordinates, PendingUpdateId, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A location sample waiting in the local queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingUpdate {
    pub id: PendingUpdateId,
    pub worker_id: WorkerId,
    pub position: Coordinates,
    pub timestamp: DateTime<Utc>,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdateDraft {
    pub worker_id: WorkerId,
    pub position: Coordinates,
    pub timestamp: DateTime<Utc>,
}

impl PendingUpdateDraft {
    pub fn new(worker_id: WorkerId, position: Coordinates, timestamp: DateTime<Utc>) -> Self {
        Self {
            worker_id,
            position,
            timestamp,
        }
    }
}
