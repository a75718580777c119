/// Synced location samples older than this are swept from the local queue.
pub const LOCATION_RETENTION_DAYS: i64 = 7;

/// Preference key remembering the last activated base layer.
pub const ACTIVE_LAYER_PREFERENCE: &str = "map";
