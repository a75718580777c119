use crate::domain::entities::{ArchiveRecord, PendingUpdate};
use crate::domain::value_objects::{
    ArchiveVersion, CacheKey, Coordinates, GeoBounds, PendingUpdateId, WorkerId,
};
use crate::shared::error::AppError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ArchiveRow {
    pub cache_key: String,
    pub name: String,
    pub description: String,
    pub attribution: String,
    pub version: Option<String>,
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
    pub min_zoom: i64,
    pub max_zoom: i64,
    pub created_at: i64,
    pub payload: Vec<u8>,
}

impl ArchiveRow {
    pub fn into_domain(self) -> Result<(CacheKey, ArchiveRecord), AppError> {
        let key = CacheKey::new(self.cache_key).map_err(AppError::Storage)?;
        let bounds = GeoBounds::from_degrees(self.min_lat, self.min_lon, self.max_lat, self.max_lon)
            .map_err(|e| AppError::Storage(format!("Corrupt bounds for {key}: {e}")))?;
        let min_zoom = zoom_from_column(self.min_zoom, "min_zoom")?;
        let max_zoom = zoom_from_column(self.max_zoom, "max_zoom")?;
        let timestamp = millis_to_datetime(self.created_at, "created_at")?;

        let record = ArchiveRecord::new(
            self.name,
            self.description,
            self.attribution,
            ArchiveVersion::from_optional(self.version),
            bounds,
            min_zoom,
            max_zoom,
            timestamp,
            Bytes::from(self.payload),
        )
        .map_err(|e| AppError::Storage(format!("Corrupt archive record {key}: {e}")))?;

        Ok((key, record))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PendingUpdateRow {
    pub id: i64,
    pub worker_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: i64,
    pub is_synced: bool,
    pub synced_at: Option<i64>,
}

impl PendingUpdateRow {
    pub fn into_domain(self) -> Result<PendingUpdate, AppError> {
        let synced_at = self
            .synced_at
            .map(|value| millis_to_datetime(value, "synced_at"))
            .transpose()?;

        Ok(PendingUpdate {
            id: PendingUpdateId::new(self.id).map_err(AppError::Storage)?,
            worker_id: WorkerId::new(self.worker_id).map_err(AppError::Storage)?,
            position: Coordinates::new(self.latitude, self.longitude)
                .map_err(AppError::Storage)?,
            timestamp: millis_to_datetime(self.created_at, "created_at")?,
            synced: self.is_synced,
            synced_at,
        })
    }
}

fn zoom_from_column(value: i64, column: &str) -> Result<u8, AppError> {
    u8::try_from(value).map_err(|_| AppError::Storage(format!("Invalid {column}: {value}")))
}

fn millis_to_datetime(value: i64, column: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(value)
        .ok_or_else(|| AppError::Storage(format!("Invalid {column} timestamp: {value}")))
}
