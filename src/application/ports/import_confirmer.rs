use crate::domain::value_objects::CacheKey;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPrompt {
    pub key: CacheKey,
    pub name: String,
    pub size_label: String,
    pub replaces_existing: bool,
}

/// Asks the user whether a network archive should be downloaded.
#[async_trait]
pub trait ImportConfirmer: Send + Sync {
    async fn confirm_download(&self, prompt: &DownloadPrompt) -> bool;
}

/// Accepts every prompt; used for unattended imports.
pub struct AutoConfirm;

#[async_trait]
impl ImportConfirmer for AutoConfirm {
    async fn confirm_download(&self, _prompt: &DownloadPrompt) -> bool {
        true
    }
}
