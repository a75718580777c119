use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingUpdateId(i64);

impl PendingUpdateId {
    pub fn new(value: i64) -> Result<Self, String> {
        if value <= 0 {
            return Err("Pending update id must be positive".to_string());
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PendingUpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PendingUpdateId> for i64 {
    fn from(id: PendingUpdateId) -> Self {
        id.0
    }
}
