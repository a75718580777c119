use crate::domain::value_objects::{Coordinates, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRegistration {
    pub worker_id: WorkerId,
    pub name: String,
    pub email: String,
}

impl WorkerRegistration {
    pub fn new(worker_id: WorkerId, name: &str, email: &str) -> Result<Self, String> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err("Worker name is required".to_string());
        }
        if email.is_empty() {
            return Err("Worker email is required".to_string());
        }
        if !email.contains('@') {
            return Err(format!("Worker email is malformed: {email}"));
        }
        Ok(Self {
            worker_id,
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}

/// Roster entry as reported by the team server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker_id: WorkerId,
    pub name: String,
    pub email: String,
    pub last_location: Option<Coordinates>,
    pub last_seen: Option<DateTime<Utc>>,
}
