use crate::domain::value_objects::{ArchiveVersion, GeoBounds};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

/// Declared description of a tile archive, read from its header and metadata block.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub attribution: Option<String>,
    pub version: Option<ArchiveVersion>,
    pub format: Option<String>,
    pub has_vector_layers: bool,
    pub bounds: GeoBounds,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub tile_data_length: u64,
}

impl ArchiveInfo {
    /// Vector archives advertise `"format": "pbf"` or a `vector_layers` list in their
    /// metadata. Nothing stronger is available without reading tile payloads.
    pub fn is_vector(&self) -> bool {
        self.format.as_deref() == Some("pbf") || self.has_vector_layers
    }
}

/// A raster archive persisted in the asset store.
#[derive(Clone, PartialEq)]
pub struct ArchiveRecord {
    pub name: String,
    pub description: String,
    pub attribution: String,
    pub version: Option<ArchiveVersion>,
    pub bounds: GeoBounds,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub timestamp: DateTime<Utc>,
    pub payload: Bytes,
}

impl ArchiveRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        description: String,
        attribution: String,
        version: Option<ArchiveVersion>,
        bounds: GeoBounds,
        min_zoom: u8,
        max_zoom: u8,
        timestamp: DateTime<Utc>,
        payload: Bytes,
    ) -> Result<Self, String> {
        if min_zoom > max_zoom {
            return Err(format!(
                "min_zoom ({min_zoom}) must not exceed max_zoom ({max_zoom})"
            ));
        }
        if name.trim().is_empty() {
            return Err("Archive name cannot be empty".to_string());
        }
        Ok(Self {
            name,
            description,
            attribution,
            version,
            bounds,
            min_zoom,
            max_zoom,
            timestamp,
            payload,
        })
    }

    /// Builds the stored record from inspected metadata. Missing names fall back to the
    /// file name, missing description/attribution become empty strings.
    pub fn from_info(
        info: &ArchiveInfo,
        fallback_name: &str,
        payload: Bytes,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, String> {
        let name = info
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        Self::new(
            name,
            info.description.clone().unwrap_or_default(),
            info.attribution.clone().unwrap_or_default(),
            info.version.clone(),
            info.bounds,
            info.min_zoom,
            info.max_zoom,
            timestamp,
            payload,
        )
    }

    pub fn payload_len(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Display label with underscores turned into spaces.
    pub fn label(&self) -> String {
        self.name.replace('_', " ")
    }
}

impl fmt::Debug for ArchiveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveRecord")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("bounds", &self.bounds)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("timestamp", &self.timestamp)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> ArchiveInfo {
        ArchiveInfo {
            name: None,
            description: None,
            attribution: Some("USGS".into()),
            version: None,
            format: Some("png".into()),
            has_vector_layers: false,
            bounds: GeoBounds::from_degrees(44.0, -72.0, 45.0, -71.0).unwrap(),
            min_zoom: 10,
            max_zoom: 16,
            tile_data_length: 2048,
        }
    }

    #[test]
    fn vector_heuristic_uses_format_and_layers() {
        let mut info = sample_info();
        assert!(!info.is_vector());

        info.format = Some("pbf".into());
        assert!(info.is_vector());

        info.format = Some("webp".into());
        info.has_vector_layers = true;
        assert!(info.is_vector());
    }

    #[test]
    fn from_info_applies_defaults() {
        let record = ArchiveRecord::from_info(
            &sample_info(),
            "white_mountains",
            Bytes::from_static(b"tiles"),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(record.name, "white_mountains");
        assert_eq!(record.label(), "white mountains");
        assert_eq!(record.description, "");
        assert_eq!(record.attribution, "USGS");
        assert!(record.version.is_none());
        assert_eq!(record.payload_len(), 5);
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let mut info = sample_info();
        info.min_zoom = 17;
        let result = ArchiveRecord::from_info(&info, "x", Bytes::new(), Utc::now());
        assert!(result.is_err());
    }
}
