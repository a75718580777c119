use crate::application::ports::{AssetStore, LayerPreferences};
use crate::domain::entities::{LayerEntry, LayerEvent, OverlayEntry, RasterLayer};
use crate::domain::value_objects::{CacheKey, Coordinates};
use crate::shared::error::AppError;
use futures::TryStreamExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

const EVENT_CAPACITY: usize = 64;

const GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

#[derive(Default)]
struct RegistryState {
    layers: BTreeMap<CacheKey, LayerEntry>,
    preview: Option<LayerEntry>,
    active: Option<CacheKey>,
    overlays: Vec<OverlayEntry>,
}

impl RegistryState {
    /// Exactly one base layer (stored or preview) is visible afterwards.
    fn show_only(&mut self, key: &CacheKey) {
        for entry in self.layers.values_mut() {
            entry.visible = entry.key() == key;
        }
        if let Some(preview) = self.preview.as_mut() {
            preview.visible = preview.key() == key;
        }
        self.active = Some(key.clone());
    }

    fn deactivate(&mut self, key: &CacheKey) -> bool {
        if self.active.as_ref() == Some(key) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

/// In-memory view of the stored archives as renderable layers, plus the transient preview
/// layer and GeoJSON overlays. Nothing here is persisted except the active-layer pointer;
/// the registry can be dropped and rebuilt from the asset store at any time.
pub struct LayerRegistry {
    store: Arc<dyn AssetStore>,
    preferences: Arc<dyn LayerPreferences>,
    state: RwLock<RegistryState>,
    events: broadcast::Sender<LayerEvent>,
}

impl LayerRegistry {
    pub fn new(store: Arc<dyn AssetStore>, preferences: Arc<dyn LayerPreferences>) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            preferences,
            state: RwLock::new(RegistryState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LayerEvent> {
        self.events.subscribe()
    }

    /// Reconciles the registry with the asset store: new keys are materialized, vanished keys
    /// evicted. Returns the emitted events in order. A storage failure is returned before any
    /// state changes.
    pub async fn sync(&self) -> Result<Vec<LayerEvent>, AppError> {
        // a failed listing leaves the registry and the remembered layer untouched
        let records: Vec<_> = self.store.list_all().try_collect().await?;
        let stored: BTreeMap<CacheKey, RasterLayer> = records
            .into_iter()
            .map(|(key, record)| {
                let layer = RasterLayer::from_record(key.clone(), &record);
                (key, layer)
            })
            .collect();

        let mut events = Vec::new();
        let mut cleared_active = None;
        {
            let mut state = self.state.write().await;

            let vanished: Vec<CacheKey> = state
                .layers
                .keys()
                .filter(|key| !stored.contains_key(*key))
                .cloned()
                .collect();
            for key in vanished {
                state.layers.remove(&key);
                if state.deactivate(&key) {
                    cleared_active = Some(key.clone());
                }
                events.push(LayerEvent::Removed(key));
            }

            for (key, layer) in stored {
                if let Some(existing) = state.layers.get_mut(&key) {
                    // replaced records keep their visibility
                    existing.layer = layer;
                    continue;
                }
                state.layers.insert(
                    key.clone(),
                    LayerEntry {
                        layer,
                        visible: false,
                    },
                );
                events.push(LayerEvent::Discovered(key));
            }
        }

        if let Some(key) = cleared_active {
            self.forget_if_remembered(&key).await?;
        }

        for event in &events {
            self.emit(event.clone());
        }
        tracing::debug!(
            target: "offline::assets",
            changes = events.len(),
            "layer registry synced"
        );
        Ok(events)
    }

    /// Makes `key` the single visible base layer. Stored layers are remembered across
    /// restarts; the preview layer is not.
    pub async fn activate(&self, key: &CacheKey) -> Result<(), AppError> {
        let persistent = {
            let mut state = self.state.write().await;
            let stored = state.layers.contains_key(key);
            let is_preview = state.preview.as_ref().is_some_and(|p| p.key() == key);
            if !stored && !is_preview {
                return Err(AppError::NotFound(format!("layer {key}")));
            }
            state.show_only(key);
            stored
        };

        if persistent {
            self.preferences.set_active_layer(key).await?;
        }
        self.emit(LayerEvent::Activated(key.clone()));
        Ok(())
    }

    /// Deletes the archive from storage, then evicts its layer. Clears the active pointer
    /// and the remembered preference when they reference `key`.
    pub async fn remove(&self, key: &CacheKey) -> Result<bool, AppError> {
        self.store.delete(key).await?;

        let existed = {
            let mut state = self.state.write().await;
            let existed = state.layers.remove(key).is_some();
            state.deactivate(key);
            existed
        };
        self.forget_if_remembered(key).await?;

        if existed {
            self.emit(LayerEvent::Removed(key.clone()));
        }
        tracing::info!(target: "offline::assets", cache_key = %key, existed, "archive removed");
        Ok(existed)
    }

    /// Shows a streamed, not yet stored archive as the active base layer.
    pub async fn show_preview(&self, layer: RasterLayer) {
        let key = layer.key.clone();
        {
            let mut state = self.state.write().await;
            state.preview = Some(LayerEntry {
                layer,
                visible: true,
            });
            state.show_only(&key);
        }
        self.emit(LayerEvent::PreviewShown(key));
    }

    pub async fn clear_preview(&self) -> Option<LayerEntry> {
        let cleared = {
            let mut state = self.state.write().await;
            let cleared = state.preview.take();
            if let Some(entry) = &cleared {
                let key = entry.key().clone();
                state.deactivate(&key);
            }
            cleared
        };
        if let Some(entry) = &cleared {
            self.emit(LayerEvent::PreviewCleared(entry.key().clone()));
        }
        cleared
    }

    pub async fn preview(&self) -> Option<LayerEntry> {
        self.state.read().await.preview.clone()
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.state.read().await.layers.contains_key(key)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<LayerEntry> {
        self.state.read().await.layers.get(key).cloned()
    }

    pub async fn layers(&self) -> Vec<LayerEntry> {
        self.state.read().await.layers.values().cloned().collect()
    }

    pub async fn active_key(&self) -> Option<CacheKey> {
        self.state.read().await.active.clone()
    }

    pub async fn active_layer(&self) -> Option<LayerEntry> {
        let state = self.state.read().await;
        let key = state.active.as_ref()?;
        state
            .layers
            .get(key)
            .or_else(|| state.preview.as_ref().filter(|p| p.key() == key))
            .cloned()
    }

    /// Centre of the active layer's bounds, used when no position fix is available.
    pub async fn view_center(&self) -> Option<Coordinates> {
        self.active_layer()
            .await
            .map(|entry| entry.layer.bounds.center())
    }

    /// Adds a GeoJSON overlay. Overlays stack independently of the base-layer selection.
    pub async fn add_overlay(
        &self,
        fallback_name: &str,
        document: Value,
    ) -> Result<OverlayEntry, AppError> {
        let feature_count = geojson_feature_count(&document)?;
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(fallback_name)
            .to_string();

        let overlay = OverlayEntry {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            feature_count,
            document,
            visible: true,
        };
        self.state.write().await.overlays.push(overlay.clone());
        tracing::debug!(
            target: "offline::import",
            overlay = %overlay.name,
            features = feature_count,
            "overlay added"
        );
        Ok(overlay)
    }

    pub async fn set_overlay_visible(&self, id: &str, visible: bool) -> bool {
        let mut state = self.state.write().await;
        match state.overlays.iter_mut().find(|o| o.id == id) {
            Some(overlay) => {
                overlay.visible = visible;
                true
            }
            None => false,
        }
    }

    pub async fn remove_overlay(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let before = state.overlays.len();
        state.overlays.retain(|o| o.id != id);
        state.overlays.len() != before
    }

    pub async fn overlays(&self) -> Vec<OverlayEntry> {
        self.state.read().await.overlays.clone()
    }

    async fn forget_if_remembered(&self, key: &CacheKey) -> Result<(), AppError> {
        if self.preferences.active_layer().await?.as_ref() == Some(key) {
            self.preferences.clear_active_layer().await?;
        }
        Ok(())
    }

    fn emit(&self, event: LayerEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

fn geojson_feature_count(document: &Value) -> Result<usize, AppError> {
    let kind = document
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::ValidationError("GeoJSON document has no type".to_string()))?;

    match kind {
        "FeatureCollection" => document
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| {
                AppError::ValidationError("FeatureCollection without features".to_string())
            }),
        "Feature" => Ok(1),
        other if GEOMETRY_TYPES.contains(&other) => Ok(1),
        other => Err(AppError::ValidationError(format!(
            "Unsupported GeoJSON type: {other}"
        ))),
    }
}
