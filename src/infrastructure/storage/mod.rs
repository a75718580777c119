pub mod queries;
pub mod rows;
pub mod sqlite_asset_store;
pub mod sqlite_pending_queue;
pub mod sqlite_preferences;

pub use sqlite_asset_store::SqliteAssetStore;
pub use sqlite_pending_queue::SqlitePendingUpdateQueue;
pub use sqlite_preferences::SqliteLayerPreferences;
