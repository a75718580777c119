use super::queries::{
    ARCHIVE_EXISTS, DELETE_ARCHIVE, SELECT_ALL_ARCHIVES, SELECT_ARCHIVE_BY_KEY, UPSERT_ARCHIVE,
};
use super::rows::ArchiveRow;
use crate::application::ports::AssetStore;
use crate::domain::entities::ArchiveRecord;
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use futures::future;
use futures::StreamExt;
use futures::stream::BoxStream;

/// Archive blobs and their metadata in the `archives` table. Each record is a single row so a
/// replacement is one statement: readers see either the old row or the new one.
#[derive(Clone)]
pub struct SqliteAssetStore {
    pool: ConnectionPool,
}

impl SqliteAssetStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetStore for SqliteAssetStore {
    async fn put(&self, key: &CacheKey, record: &ArchiveRecord) -> Result<(), AppError> {
        let sw = record.bounds.south_west;
        let ne = record.bounds.north_east;

        sqlx::query(UPSERT_ARCHIVE)
            .bind(key.as_str())
            .bind(&record.name)
            .bind(&record.description)
            .bind(&record.attribution)
            .bind(record.version.as_ref().map(|v| v.as_str()))
            .bind(sw.latitude())
            .bind(sw.longitude())
            .bind(ne.latitude())
            .bind(ne.longitude())
            .bind(i64::from(record.min_zoom))
            .bind(i64::from(record.max_zoom))
            .bind(record.timestamp.timestamp_millis())
            .bind(record.payload.as_ref())
            .execute(self.pool.get_pool())
            .await?;

        tracing::debug!(
            target: "offline::assets",
            cache_key = %key,
            bytes = record.payload_len(),
            "archive stored"
        );
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<ArchiveRecord, AppError> {
        let row = sqlx::query_as::<_, ArchiveRow>(SELECT_ARCHIVE_BY_KEY)
            .bind(key.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;

        match row {
            Some(row) => row.into_domain().map(|(_, record)| record),
            None => Err(AppError::NotFound(format!("archive {key}"))),
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_ARCHIVE)
            .bind(key.as_str())
            .execute(self.pool.get_pool())
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(target: "offline::assets", cache_key = %key, "archive deleted");
        }
        Ok(())
    }

    async fn contains(&self, key: &CacheKey) -> Result<bool, AppError> {
        let row = sqlx::query(ARCHIVE_EXISTS)
            .bind(key.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(row.is_some())
    }

    /// Rows that fail to decode are logged and skipped; query failures are yielded as errors.
    fn list_all(&self) -> BoxStream<'_, Result<(CacheKey, ArchiveRecord), AppError>> {
        sqlx::query_as::<_, ArchiveRow>(SELECT_ALL_ARCHIVES)
            .fetch(self.pool.get_pool())
            .filter_map(|row| {
                let item = match row {
                    Ok(row) => match row.into_domain() {
                        Ok(entry) => Some(Ok(entry)),
                        Err(err) => {
                            tracing::warn!(
                                target: "offline::assets",
                                error = %err,
                                "skipping unreadable archive record"
                            );
                            None
                        }
                    },
                    Err(err) => Some(Err(AppError::from(err))),
                };
                future::ready(item)
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ArchiveVersion, GeoBounds};
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use futures::TryStreamExt;

    async fn setup_store() -> SqliteAssetStore {
        let pool = ConnectionPool::from_memory()
            .await
            .expect("failed to create pool");
        pool.migrate().await.expect("failed to migrate");
        SqliteAssetStore::new(pool)
    }

    fn sample_record(version: Option<&str>, payload: &'static [u8]) -> ArchiveRecord {
        ArchiveRecord::new(
            "green_mountains".into(),
            "Trail network".into(),
            "USGS".into(),
            version.map(|v| ArchiveVersion::new(v.to_string()).unwrap()),
            GeoBounds::from_degrees(43.5, -73.2, 44.9, -72.1).unwrap(),
            8,
            15,
            Utc.timestamp_millis_opt(1_740_000_000_000).unwrap(),
            Bytes::from_static(payload),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn put_then_get_returns_equal_record() {
        let store = setup_store().await;
        let key = CacheKey::from_url("https://maps.example.com/green.pmtiles").unwrap();
        let record = sample_record(Some("3"), b"PMTiles-raster-bytes");

        store.put(&key, &record).await.expect("put");
        let loaded = store.get(&key).await.expect("get");

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn absent_version_round_trips_as_none() {
        let store = setup_store().await;
        let key = CacheKey::local_token(1_740_000_000_123);
        store
            .put(&key, &sample_record(None, b"local"))
            .await
            .expect("put");

        assert!(store.get(&key).await.expect("get").version.is_none());
    }

    #[tokio::test]
    async fn second_put_replaces_the_whole_record() {
        let store = setup_store().await;
        let key = CacheKey::from_url("https://maps.example.com/green.pmtiles").unwrap();

        store
            .put(&key, &sample_record(Some("1"), b"first-payload"))
            .await
            .expect("first put");
        let mut replacement = sample_record(Some("2"), b"second");
        replacement.description = String::new();
        store.put(&key, &replacement).await.expect("second put");

        let loaded = store.get(&key).await.expect("get");
        assert_eq!(loaded, replacement);

        let all: Vec<_> = store.list_all().try_collect().await.expect("list");
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let store = setup_store().await;
        let key = CacheKey::local_token(42);

        let err = store.get(&key).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!store.contains(&key).await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_a_noop_for_absent_keys() {
        let store = setup_store().await;
        let key = CacheKey::local_token(7);
        store.delete(&key).await.expect("delete absent");

        store
            .put(&key, &sample_record(None, b"x"))
            .await
            .expect("put");
        store.delete(&key).await.expect("delete present");
        assert!(!store.contains(&key).await.unwrap());
    }

    #[tokio::test]
    async fn list_all_yields_every_stored_archive() {
        let store = setup_store().await;
        let first = CacheKey::local_token(1);
        let second = CacheKey::from_url("https://maps.example.com/b.pmtiles").unwrap();
        store
            .put(&first, &sample_record(None, b"a"))
            .await
            .unwrap();
        store
            .put(&second, &sample_record(Some("9"), b"b"))
            .await
            .unwrap();

        let mut keys: Vec<CacheKey> = store
            .list_all()
            .map_ok(|(key, _)| key)
            .try_collect()
            .await
            .expect("list");
        keys.sort();

        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn list_all_skips_corrupt_rows() {
        let store = setup_store().await;
        let good = CacheKey::local_token(1);
        store
            .put(&good, &sample_record(None, b"a"))
            .await
            .unwrap();
        // south edge north of the north edge
        sqlx::query(UPSERT_ARCHIVE)
            .bind("2")
            .bind("broken")
            .bind("")
            .bind("")
            .bind(None::<String>)
            .bind(45.0)
            .bind(-72.0)
            .bind(44.0)
            .bind(-71.0)
            .bind(3i64)
            .bind(9i64)
            .bind(1_740_000_000_000i64)
            .bind(&b"x"[..])
            .execute(store.pool.get_pool())
            .await
            .unwrap();

        let all: Vec<_> = store.list_all().try_collect().await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, good);
        assert!(matches!(
            store.get(&CacheKey::local_token(2)).await,
            Err(AppError::Storage(_))
        ));
    }
}
