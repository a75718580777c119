use crate::application::ports::{ArchiveSource, AssetStore};
use crate::domain::entities::ArchiveInfo;
use crate::domain::value_objects::{ArchiveVersion, CacheKey};
use crate::shared::error::AppError;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCheck {
    UpToDate,
    UpdateAvailable(ArchiveInfo),
}

/// Exact string equality. An absent local version never matches a present remote one.
pub fn versions_match(local: Option<&ArchiveVersion>, remote: Option<&ArchiveVersion>) -> bool {
    local == remote
}

pub struct VersionReconciler {
    store: Arc<dyn AssetStore>,
    source: Arc<dyn ArchiveSource>,
}

impl VersionReconciler {
    pub fn new(store: Arc<dyn AssetStore>, source: Arc<dyn ArchiveSource>) -> Self {
        Self { store, source }
    }

    /// Compares already-fetched remote metadata against the stored record. Fails with
    /// `NotFound` when nothing is cached under `key`.
    pub async fn check_for_update(
        &self,
        key: &CacheKey,
        remote: &ArchiveInfo,
    ) -> Result<UpdateCheck, AppError> {
        let local = self.store.get(key).await?;
        if versions_match(local.version.as_ref(), remote.version.as_ref()) {
            Ok(UpdateCheck::UpToDate)
        } else {
            tracing::info!(
                target: "offline::import",
                cache_key = %key,
                local_version = local.version.as_ref().map(|v| v.as_str()).unwrap_or("-"),
                remote_version = remote.version.as_ref().map(|v| v.as_str()).unwrap_or("-"),
                "archive update available"
            );
            Ok(UpdateCheck::UpdateAvailable(remote.clone()))
        }
    }

    /// Fetches the remote metadata for a URL-keyed archive and compares it. Transport
    /// failures surface as `Unreachable`; retrying is left to the caller.
    pub async fn check_remote(&self, key: &CacheKey) -> Result<UpdateCheck, AppError> {
        if !key.is_remote() {
            return Err(AppError::ValidationError(format!(
                "{key} was imported from a local file and has no remote version"
            )));
        }
        let remote = self.source.inspect(key.as_str()).await?;
        self.check_for_update(key, &remote).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(value: &str) -> ArchiveVersion {
        ArchiveVersion::new(value.to_string()).unwrap()
    }

    #[test]
    fn equal_versions_match() {
        assert!(versions_match(Some(&v("1")), Some(&v("1"))));
    }

    #[test]
    fn different_versions_do_not_match() {
        assert!(!versions_match(Some(&v("1")), Some(&v("2"))));
        assert!(!versions_match(Some(&v("1.0")), Some(&v("1"))));
    }

    #[test]
    fn missing_local_version_never_matches_remote() {
        assert!(!versions_match(None, Some(&v("1"))));
        assert!(versions_match(None, None));
    }
}
