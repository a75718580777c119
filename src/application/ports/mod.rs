pub mod archive_source;
pub mod asset_store;
pub mod import_confirmer;
pub mod layer_preferences;
pub mod location_sink;
pub mod pending_update_queue;
pub mod position_provider;
pub mod worker_directory;

pub use archive_source::ArchiveSource;
pub use asset_store::AssetStore;
pub use import_confirmer::{AutoConfirm, DownloadPrompt, ImportConfirmer};
pub use layer_preferences::LayerPreferences;
pub use location_sink::LocationSink;
pub use pending_update_queue::PendingUpdateQueue;
pub use position_provider::PositionProvider;
pub use worker_directory::WorkerDirectory;
