use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque archive version. Only compared for exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveVersion(String);

impl ArchiveVersion {
    pub fn new(value: String) -> Result<Self, String> {
        if value.is_empty() {
            return Err("Archive version cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    /// Metadata often omits the version or leaves it blank; both mean "no version".
    pub fn from_optional(value: Option<String>) -> Option<Self> {
        value.and_then(|v| Self::new(v).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
