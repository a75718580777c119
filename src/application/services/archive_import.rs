use crate::application::ports::{ArchiveSource, AssetStore, DownloadPrompt, ImportConfirmer};
use crate::application::services::layer_registry::LayerRegistry;
use crate::domain::entities::{ArchiveInfo, ArchiveRecord};
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::network::ConnectivityMonitor;
use crate::infrastructure::pmtiles;
use crate::shared::error::AppError;
use crate::shared::format::format_size;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Idle,
    Validating,
    Rejected,
    Confirming,
    Downloading,
    Persisting,
    Active,
    Cancelled,
}

impl ImportState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportState::Rejected | ImportState::Active | ImportState::Cancelled
        )
    }
}

#[derive(Debug, Clone)]
pub enum ImportSource {
    /// Archive bytes already read from a local file.
    Local { file_name: String, bytes: Bytes },
    Remote { url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported {
        key: CacheKey,
        name: String,
        replaced: bool,
    },
    Rejected {
        reason: String,
    },
    Cancelled,
}

/// Runs the validate → confirm → download → persist → activate pipeline. Expected terminal
/// states come back as `Ok(ImportOutcome)`; download and storage failures are errors, and in
/// both cases nothing was written.
pub struct ArchiveImporter {
    store: Arc<dyn AssetStore>,
    source: Arc<dyn ArchiveSource>,
    registry: Arc<LayerRegistry>,
    confirmer: Arc<dyn ImportConfirmer>,
    connectivity: ConnectivityMonitor,
    state: watch::Sender<ImportState>,
}

impl ArchiveImporter {
    pub fn new(
        store: Arc<dyn AssetStore>,
        source: Arc<dyn ArchiveSource>,
        registry: Arc<LayerRegistry>,
        confirmer: Arc<dyn ImportConfirmer>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let (state, _rx) = watch::channel(ImportState::Idle);
        Self {
            store,
            source,
            registry,
            confirmer,
            connectivity,
            state,
        }
    }

    pub fn state(&self) -> ImportState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ImportState> {
        self.state.subscribe()
    }

    pub async fn import(
        &self,
        source: ImportSource,
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, AppError> {
        let result = match source {
            ImportSource::Local { file_name, bytes } => {
                self.import_local(&file_name, bytes, cancel).await
            }
            ImportSource::Remote { url } => self.import_remote(&url, cancel).await,
        };

        match &result {
            Ok(ImportOutcome::Imported { .. }) => self.transition(ImportState::Active),
            Ok(ImportOutcome::Rejected { reason }) => {
                tracing::info!(target: "offline::import", reason = %reason, "archive rejected");
                self.transition(ImportState::Rejected);
            }
            Ok(ImportOutcome::Cancelled) => self.transition(ImportState::Cancelled),
            Err(err) => {
                tracing::warn!(target: "offline::import", error = %err, "archive import failed");
                self.transition(ImportState::Cancelled);
            }
        }
        result
    }

    async fn import_local(
        &self,
        file_name: &str,
        bytes: Bytes,
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, AppError> {
        self.transition(ImportState::Validating);
        let info = match pmtiles::inspect_bytes(&bytes) {
            Ok(info) => info,
            Err(AppError::ValidationError(reason)) => return Ok(ImportOutcome::Rejected { reason }),
            Err(err) => return Err(err),
        };
        if let Some(reason) = vector_rejection(&info) {
            return Ok(ImportOutcome::Rejected { reason });
        }
        if cancel.is_cancelled() {
            return Ok(ImportOutcome::Cancelled);
        }

        let key = CacheKey::local_token(Utc::now().timestamp_millis());
        self.persist_and_activate(key, &info, &file_stem(file_name), bytes, false)
            .await
    }

    async fn import_remote(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, AppError> {
        self.transition(ImportState::Validating);
        if !self.connectivity.is_online() {
            return Err(AppError::Network(
                "Must be online to download maps".to_string(),
            ));
        }
        let key = match CacheKey::from_url(url) {
            Ok(key) => key,
            Err(reason) => return Ok(ImportOutcome::Rejected { reason }),
        };

        let info = match self.source.inspect(key.as_str()).await {
            Ok(info) => info,
            Err(AppError::ValidationError(reason)) => return Ok(ImportOutcome::Rejected { reason }),
            Err(err) => return Err(err),
        };
        if let Some(reason) = vector_rejection(&info) {
            return Ok(ImportOutcome::Rejected { reason });
        }

        self.transition(ImportState::Confirming);
        let name = file_stem(key.as_str());
        let replaces_existing = self.store.contains(&key).await?;
        let prompt = DownloadPrompt {
            key: key.clone(),
            name: info.name.clone().unwrap_or_else(|| name.clone()),
            size_label: format_size(info.tile_data_length),
            replaces_existing,
        };
        if !self.confirmer.confirm_download(&prompt).await {
            return Ok(ImportOutcome::Cancelled);
        }

        self.transition(ImportState::Downloading);
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(target: "offline::import", cache_key = %key, "download cancelled");
                return Ok(ImportOutcome::Cancelled);
            }
            fetched = self.source.download(key.as_str()) => fetched?,
        };
        tracing::info!(
            target: "offline::import",
            cache_key = %key,
            bytes = bytes.len(),
            "archive downloaded"
        );
        if cancel.is_cancelled() {
            return Ok(ImportOutcome::Cancelled);
        }

        self.persist_and_activate(key, &info, &name, bytes, replaces_existing)
            .await
    }

    async fn persist_and_activate(
        &self,
        key: CacheKey,
        info: &ArchiveInfo,
        fallback_name: &str,
        bytes: Bytes,
        replaced: bool,
    ) -> Result<ImportOutcome, AppError> {
        self.transition(ImportState::Persisting);
        let record = match ArchiveRecord::from_info(info, fallback_name, bytes, Utc::now()) {
            Ok(record) => record,
            Err(reason) => return Ok(ImportOutcome::Rejected { reason }),
        };
        self.store.put(&key, &record).await?;

        self.registry.sync().await?;
        if self
            .registry
            .preview()
            .await
            .is_some_and(|preview| preview.key() == &key)
        {
            self.registry.clear_preview().await;
        }
        self.registry.activate(&key).await?;

        tracing::info!(
            target: "offline::import",
            cache_key = %key,
            name = %record.name,
            replaced,
            "archive imported"
        );
        Ok(ImportOutcome::Imported {
            key,
            name: record.name,
            replaced,
        })
    }

    fn transition(&self, next: ImportState) {
        self.state.send_replace(next);
    }
}

fn vector_rejection(info: &ArchiveInfo) -> Option<String> {
    info.is_vector().then(|| {
        format!(
            "Vector archives are not supported (format: {})",
            info.format.as_deref().unwrap_or("vector_layers")
        )
    })
}

/// Last path segment without query string or extension.
pub fn file_stem(source: &str) -> String {
    let without_query = source.split(['?', '#']).next().unwrap_or(source);
    let segment = without_query
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(without_query);
    let stem = match segment.rfind('.') {
        Some(idx) if idx > 0 => &segment[..idx],
        _ => segment,
    };
    if stem.is_empty() {
        source.to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_handles_urls_and_paths() {
        assert_eq!(
            file_stem("https://dl.dropboxusercontent.com/s/x/white_mtns.pmtiles?dl=1"),
            "white_mtns"
        );
        assert_eq!(file_stem("/home/ana/maps/valley.pmtiles"), "valley");
        assert_eq!(file_stem(r"C:\maps\ridge.v2.pmtiles"), "ridge.v2");
        assert_eq!(file_stem(".pmtiles"), ".pmtiles");
    }

    #[test]
    fn terminal_states() {
        assert!(ImportState::Rejected.is_terminal());
        assert!(ImportState::Cancelled.is_terminal());
        assert!(!ImportState::Downloading.is_terminal());
    }
}
