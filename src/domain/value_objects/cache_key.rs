use serde::{Deserialize, Serialize};
use std::fmt;

const DROPBOX_SHARE_HOST: &str = "www.dropbox.com";
const DROPBOX_CONTENT_HOST: &str = "dl.dropboxusercontent.com";

/// Identifies a cached archive: either the remote URL it was downloaded from or a
/// millisecond timestamp token for archives imported from a local file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Builds the key for a remote archive. Dropbox share links are rewritten to the
    /// direct-content host so the same file always maps to the same key.
    pub fn from_url(url: &str) -> Result<Self, String> {
        let trimmed = url.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(format!("Archive URL must be http(s): {trimmed}"));
        }
        Self::new(trimmed.replace(DROPBOX_SHARE_HOST, DROPBOX_CONTENT_HOST))
    }

    pub fn local_token(timestamp_millis: i64) -> Self {
        Self(timestamp_millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Cache key cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
