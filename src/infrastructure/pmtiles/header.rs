use crate::domain::entities::ArchiveInfo;
use crate::domain::value_objects::{ArchiveVersion, GeoBounds};
use crate::shared::error::AppError;
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use std::io::{Cursor, Read};

pub const HEADER_LEN: usize = 127;
const MAGIC: &[u8; 7] = b"PMTiles";
const SUPPORTED_VERSION: u8 = 3;
const E7: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Unknown,
    None,
    Gzip,
    Brotli,
    Zstd,
}

impl From<u8> for Compression {
    fn from(value: u8) -> Self {
        match value {
            1 => Compression::None,
            2 => Compression::Gzip,
            3 => Compression::Brotli,
            4 => Compression::Zstd,
            _ => Compression::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    Unknown,
    Mvt,
    Png,
    Jpeg,
    Webp,
    Avif,
}

impl From<u8> for TileType {
    fn from(value: u8) -> Self {
        match value {
            1 => TileType::Mvt,
            2 => TileType::Png,
            3 => TileType::Jpeg,
            4 => TileType::Webp,
            5 => TileType::Avif,
            _ => TileType::Unknown,
        }
    }
}

/// Fixed-size v3 header at the start of every archive. All integers are little-endian,
/// coordinates are degrees scaled by 1e7.
#[derive(Debug, Clone, PartialEq)]
pub struct PmtilesHeader {
    pub root_directory_offset: u64,
    pub root_directory_length: u64,
    pub metadata_offset: u64,
    pub metadata_length: u64,
    pub tile_data_offset: u64,
    pub tile_data_length: u64,
    pub internal_compression: Compression,
    pub tile_compression: Compression,
    pub tile_type: TileType,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    pub center_zoom: u8,
}

impl PmtilesHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, AppError> {
        if bytes.len() < HEADER_LEN {
            return Err(AppError::ValidationError(format!(
                "Archive header truncated: {} of {HEADER_LEN} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..7] != MAGIC {
            return Err(AppError::ValidationError(
                "Not a PMTiles archive (bad magic)".to_string(),
            ));
        }
        if bytes[7] != SUPPORTED_VERSION {
            return Err(AppError::ValidationError(format!(
                "Unsupported PMTiles version {}",
                bytes[7]
            )));
        }

        Ok(Self {
            root_directory_offset: read_u64(bytes, 8),
            root_directory_length: read_u64(bytes, 16),
            metadata_offset: read_u64(bytes, 24),
            metadata_length: read_u64(bytes, 32),
            tile_data_offset: read_u64(bytes, 56),
            tile_data_length: read_u64(bytes, 64),
            internal_compression: Compression::from(bytes[97]),
            tile_compression: Compression::from(bytes[98]),
            tile_type: TileType::from(bytes[99]),
            min_zoom: bytes[100],
            max_zoom: bytes[101],
            min_lon: read_e7(bytes, 102),
            min_lat: read_e7(bytes, 106),
            max_lon: read_e7(bytes, 110),
            max_lat: read_e7(bytes, 114),
            center_zoom: bytes[118],
        })
    }

    /// Byte range of the metadata block, end exclusive.
    pub fn metadata_range(&self) -> std::ops::Range<u64> {
        self.metadata_offset..self.metadata_offset.saturating_add(self.metadata_length)
    }

    pub fn bounds(&self) -> Result<GeoBounds, AppError> {
        GeoBounds::from_degrees(self.min_lat, self.min_lon, self.max_lat, self.max_lon)
            .map_err(AppError::ValidationError)
    }
}

/// The JSON metadata block. Only the members used for display and the raster/vector
/// decision are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub attribution: Option<String>,
    pub version: Option<Value>,
    pub format: Option<String>,
    pub vector_layers: Option<Value>,
}

impl ArchiveMetadata {
    pub fn decode(header: &PmtilesHeader, raw: &[u8]) -> Result<Self, AppError> {
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let json = match header.internal_compression {
            Compression::None | Compression::Unknown => raw.to_vec(),
            Compression::Gzip => {
                let mut decoder = GzDecoder::new(Cursor::new(raw));
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).map_err(|e| {
                    AppError::ValidationError(format!("Metadata is not valid gzip: {e}"))
                })?;
                out
            }
            other => {
                return Err(AppError::ValidationError(format!(
                    "Unsupported metadata compression: {other:?}"
                )));
            }
        };

        serde_json::from_slice(&json)
            .map_err(|e| AppError::ValidationError(format!("Malformed archive metadata: {e}")))
    }

    /// Versions show up as strings or bare numbers depending on the tool that wrote them.
    fn version(&self) -> Option<ArchiveVersion> {
        let raw = match self.version.as_ref()? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        ArchiveVersion::from_optional(Some(raw))
    }

    fn has_vector_layers(&self) -> bool {
        matches!(&self.vector_layers, Some(v) if !v.is_null())
    }
}

pub fn archive_info(header: &PmtilesHeader, metadata: &ArchiveMetadata) -> Result<ArchiveInfo, AppError> {
    Ok(ArchiveInfo {
        name: metadata.name.clone(),
        description: metadata.description.clone(),
        attribution: metadata.attribution.clone(),
        version: metadata.version(),
        format: metadata.format.clone(),
        has_vector_layers: metadata.has_vector_layers(),
        bounds: header.bounds()?,
        min_zoom: header.min_zoom,
        max_zoom: header.max_zoom,
        tile_data_length: header.tile_data_length,
    })
}

/// Inspects a complete archive already held in memory (local imports).
pub fn inspect_bytes(bytes: &[u8]) -> Result<ArchiveInfo, AppError> {
    let header = PmtilesHeader::parse(bytes)?;
    let range = header.metadata_range();
    let start = usize::try_from(range.start)
        .map_err(|_| AppError::ValidationError("Metadata offset out of range".to_string()))?;
    let end = usize::try_from(range.end)
        .map_err(|_| AppError::ValidationError("Metadata length out of range".to_string()))?;
    let raw = bytes.get(start..end).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Metadata block {start}..{end} lies outside the {} byte archive",
            bytes.len()
        ))
    })?;

    let metadata = ArchiveMetadata::decode(&header, raw)?;
    archive_info(&header, &metadata)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

fn read_e7(bytes: &[u8], offset: usize) -> f64 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    f64::from(i32::from_le_bytes(buf)) / E7
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn build_archive(metadata: &[u8], compression: u8, tile_type: u8) -> Vec<u8> {
        let mut header = vec![0u8; HEADER_LEN];
        header[0..7].copy_from_slice(MAGIC);
        header[7] = 3;
        header[24..32].copy_from_slice(&(HEADER_LEN as u64).to_le_bytes());
        header[32..40].copy_from_slice(&(metadata.len() as u64).to_le_bytes());
        header[64..72].copy_from_slice(&4096u64.to_le_bytes());
        header[97] = compression;
        header[99] = tile_type;
        header[100] = 6;
        header[101] = 14;
        header[102..106].copy_from_slice(&(-725_000_000i32).to_le_bytes());
        header[106..110].copy_from_slice(&(440_000_000i32).to_le_bytes());
        header[110..114].copy_from_slice(&(-715_000_000i32).to_le_bytes());
        header[114..118].copy_from_slice(&(450_000_000i32).to_le_bytes());
        header.extend_from_slice(metadata);
        header
    }

    #[test]
    fn reads_plain_metadata_and_header_fields() {
        let archive = build_archive(
            br#"{"name":"trails","attribution":"OSM","version":"2","format":"png"}"#,
            1,
            2,
        );
        let header = PmtilesHeader::parse(&archive).unwrap();
        assert_eq!(header.tile_type, TileType::Png);
        assert_eq!(header.internal_compression, Compression::None);

        let info = inspect_bytes(&archive).unwrap();
        assert_eq!(info.name.as_deref(), Some("trails"));
        assert_eq!(info.version.as_ref().map(|v| v.as_str()), Some("2"));
        assert_eq!((info.min_zoom, info.max_zoom), (6, 14));
        assert_eq!(info.tile_data_length, 4096);
        assert_eq!(info.bounds.south_west.latitude(), 44.0);
        assert_eq!(info.bounds.north_east.longitude(), -71.5);
        assert!(!info.is_vector());
    }

    #[test]
    fn reads_gzip_metadata() {
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder
            .write_all(br#"{"format":"pbf","vector_layers":[{"id":"roads"}],"version":3}"#)
            .unwrap();
        let archive = build_archive(&encoder.finish().unwrap(), 2, 1);

        let info = inspect_bytes(&archive).unwrap();
        assert!(info.is_vector());
        assert_eq!(info.version.as_ref().map(|v| v.as_str()), Some("3"));
    }

    #[test]
    fn null_vector_layers_do_not_count_as_vector() {
        let archive = build_archive(br#"{"format":"jpg","vector_layers":null}"#, 1, 3);
        assert!(!inspect_bytes(&archive).unwrap().is_vector());
    }

    #[test]
    fn rejects_bad_magic_and_truncation() {
        assert!(matches!(
            PmtilesHeader::parse(b"PMTiles"),
            Err(AppError::ValidationError(_))
        ));

        let mut archive = build_archive(b"{}", 1, 2);
        archive[0] = b'X';
        assert!(inspect_bytes(&archive).is_err());
    }

    #[test]
    fn rejects_metadata_past_end_of_archive() {
        let mut archive = build_archive(b"{}", 1, 2);
        archive.truncate(HEADER_LEN + 1);
        assert!(matches!(
            inspect_bytes(&archive),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn malformed_metadata_is_a_validation_error() {
        let archive = build_archive(b"{not json", 1, 2);
        assert!(matches!(
            inspect_bytes(&archive),
            Err(AppError::ValidationError(_))
        ));
    }
}
