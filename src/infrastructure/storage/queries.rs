pub const UPSERT_ARCHIVE: &str = r#"
    INSERT INTO archives (
        cache_key, name, description, attribution, version,
        min_lat, min_lon, max_lat, max_lon,
        min_zoom, max_zoom, created_at, payload
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(cache_key) DO UPDATE SET
        name = excluded.name,
        description = excluded.description,
        attribution = excluded.attribution,
        version = excluded.version,
        min_lat = excluded.min_lat,
        min_lon = excluded.min_lon,
        max_lat = excluded.max_lat,
        max_lon = excluded.max_lon,
        min_zoom = excluded.min_zoom,
        max_zoom = excluded.max_zoom,
        created_at = excluded.created_at,
        payload = excluded.payload
"#;

pub const SELECT_ARCHIVE_BY_KEY: &str = r#"
    SELECT cache_key, name, description, attribution, version,
           min_lat, min_lon, max_lat, max_lon,
           min_zoom, max_zoom, created_at, payload
    FROM archives
    WHERE cache_key = ?1
"#;

pub const SELECT_ALL_ARCHIVES: &str = r#"
    SELECT cache_key, name, description, attribution, version,
           min_lat, min_lon, max_lat, max_lon,
           min_zoom, max_zoom, created_at, payload
    FROM archives
    ORDER BY created_at ASC, cache_key ASC
"#;

pub const ARCHIVE_EXISTS: &str = r#"
    SELECT 1 FROM archives WHERE cache_key = ?1
"#;

pub const DELETE_ARCHIVE: &str = r#"
    DELETE FROM archives WHERE cache_key = ?1
"#;

pub const INSERT_PENDING_UPDATE: &str = r#"
    INSERT INTO pending_updates (worker_id, latitude, longitude, created_at, is_synced)
    VALUES (?1, ?2, ?3, ?4, 0)
"#;

pub const SELECT_UNSYNCED_UPDATES: &str = r#"
    SELECT id, worker_id, latitude, longitude, created_at, is_synced, synced_at
    FROM pending_updates
    WHERE is_synced = 0
    ORDER BY id ASC
"#;

pub const MARK_UPDATE_SYNCED: &str = r#"
    UPDATE pending_updates
    SET is_synced = 1, synced_at = ?1
    WHERE id = ?2 AND is_synced = 0
"#;

pub const DELETE_EXPIRED_UPDATES: &str = r#"
    DELETE FROM pending_updates
    WHERE is_synced = 1 AND created_at < ?1
"#;

pub const COUNT_UNSYNCED_UPDATES: &str = r#"
    SELECT COUNT(*) AS count FROM pending_updates WHERE is_synced = 0
"#;

pub const SELECT_PREFERENCE: &str = r#"
    SELECT value FROM preferences WHERE key = ?1
"#;

pub const UPSERT_PREFERENCE: &str = r#"
    INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

pub const DELETE_PREFERENCE: &str = r#"
    DELETE FROM preferences WHERE key = ?1
"#;
