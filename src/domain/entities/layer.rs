use crate::domain::entities::archive::{ArchiveInfo, ArchiveRecord};
use crate::domain::value_objects::{ArchiveVersion, CacheKey, GeoBounds};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Renderable description of a raster base layer. Tiles are served from the cached
/// archive identified by `key`; zoom levels past `max_native_zoom` are upscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterLayer {
    pub key: CacheKey,
    pub name: String,
    pub attribution: String,
    pub bounds: GeoBounds,
    pub min_zoom: u8,
    pub max_native_zoom: u8,
    pub version: Option<ArchiveVersion>,
}

impl RasterLayer {
    pub fn from_record(key: CacheKey, record: &ArchiveRecord) -> Self {
        Self {
            key,
            name: record.label(),
            attribution: record.attribution.clone(),
            bounds: record.bounds,
            min_zoom: record.min_zoom,
            max_native_zoom: record.max_zoom,
            version: record.version.clone(),
        }
    }

    /// Layer for an archive that is only streamed, not yet stored.
    pub fn from_info(key: CacheKey, info: &ArchiveInfo) -> Self {
        Self {
            name: info.name.clone().unwrap_or_else(|| key.to_string()),
            attribution: info.attribution.clone().unwrap_or_default(),
            bounds: info.bounds,
            min_zoom: info.min_zoom,
            max_native_zoom: info.max_zoom,
            version: info.version.clone(),
            key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub layer: RasterLayer,
    pub visible: bool,
}

impl LayerEntry {
    pub fn key(&self) -> &CacheKey {
        &self.layer.key
    }
}

/// GeoJSON overlay shown on top of the active base layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayEntry {
    pub id: String,
    pub name: String,
    pub feature_count: usize,
    pub document: Value,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum LayerEvent {
    Discovered(CacheKey),
    Removed(CacheKey),
    Activated(CacheKey),
    PreviewShown(CacheKey),
    PreviewCleared(CacheKey),
}
