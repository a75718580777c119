use crate::application::ports::{ArchiveSource, LayerPreferences};
use crate::application::services::layer_registry::LayerRegistry;
use crate::application::services::version_reconciler::{UpdateCheck, VersionReconciler};
use crate::domain::entities::{ArchiveInfo, RasterLayer};
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::network::ConnectivityMonitor;
use crate::shared::error::AppError;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum StartupSelection {
    /// A stored archive was activated. `update` carries newer remote metadata, if any.
    Activated {
        key: CacheKey,
        update: Option<ArchiveInfo>,
    },
    /// An unknown remote raster archive is streamed as a preview and can be saved.
    Preview { key: CacheKey, info: ArchiveInfo },
    Rejected { key: CacheKey, reason: String },
    Unavailable { key: CacheKey, reason: String },
    /// No map was requested; the remembered base layer was restored.
    Remembered { key: CacheKey },
    NoneSelected,
}

/// Picks the base layer shown at startup from the `map` parameter or the remembered
/// preference.
pub struct MapSession {
    registry: Arc<LayerRegistry>,
    reconciler: Arc<VersionReconciler>,
    source: Arc<dyn ArchiveSource>,
    preferences: Arc<dyn LayerPreferences>,
    connectivity: ConnectivityMonitor,
}

impl MapSession {
    pub fn new(
        registry: Arc<LayerRegistry>,
        reconciler: Arc<VersionReconciler>,
        source: Arc<dyn ArchiveSource>,
        preferences: Arc<dyn LayerPreferences>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        Self {
            registry,
            reconciler,
            source,
            preferences,
            connectivity,
        }
    }

    pub async fn open(&self, map_param: Option<&str>) -> Result<StartupSelection, AppError> {
        self.registry.sync().await?;

        match map_param.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => self.open_requested(raw).await,
            None => self.restore_remembered().await,
        }
    }

    async fn open_requested(&self, raw: &str) -> Result<StartupSelection, AppError> {
        let key = if raw.starts_with("http://") || raw.starts_with("https://") {
            CacheKey::from_url(raw).map_err(AppError::ValidationError)?
        } else {
            CacheKey::new(raw.to_string()).map_err(AppError::ValidationError)?
        };

        if self.registry.contains(&key).await {
            self.registry.activate(&key).await?;
            let update = self.routine_update_check(&key).await;
            return Ok(StartupSelection::Activated { key, update });
        }

        if !self.connectivity.is_online() {
            return Ok(StartupSelection::Unavailable {
                key,
                reason: "Cannot load new maps when offline".to_string(),
            });
        }
        if !key.is_remote() {
            return Ok(StartupSelection::Unavailable {
                key,
                reason: "No stored archive with this key".to_string(),
            });
        }

        let info = match self.source.inspect(key.as_str()).await {
            Ok(info) => info,
            Err(AppError::ValidationError(reason)) => {
                return Ok(StartupSelection::Rejected { key, reason });
            }
            Err(err) => {
                return Ok(StartupSelection::Unavailable {
                    key,
                    reason: err.to_string(),
                });
            }
        };
        if info.is_vector() {
            return Ok(StartupSelection::Rejected {
                key,
                reason: "Vector archives are not supported".to_string(),
            });
        }

        self.registry
            .show_preview(RasterLayer::from_info(key.clone(), &info))
            .await;
        Ok(StartupSelection::Preview { key, info })
    }

    async fn restore_remembered(&self) -> Result<StartupSelection, AppError> {
        let Some(key) = self.preferences.active_layer().await? else {
            return Ok(StartupSelection::NoneSelected);
        };
        if !self.registry.contains(&key).await {
            self.preferences.clear_active_layer().await?;
            return Ok(StartupSelection::NoneSelected);
        }
        self.registry.activate(&key).await?;
        Ok(StartupSelection::Remembered { key })
    }

    /// Update checks only run online and never fail the startup path.
    async fn routine_update_check(&self, key: &CacheKey) -> Option<ArchiveInfo> {
        if !key.is_remote() || !self.connectivity.is_online() {
            return None;
        }
        match self.reconciler.check_remote(key).await {
            Ok(UpdateCheck::UpdateAvailable(info)) => Some(info),
            Ok(UpdateCheck::UpToDate) => None,
            Err(err) => {
                tracing::debug!(
                    target: "offline::import",
                    cache_key = %key,
                    error = %err,
                    "update check skipped"
                );
                None
            }
        }
    }
}
