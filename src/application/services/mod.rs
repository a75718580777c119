pub mod archive_import;
pub mod layer_registry;
pub mod location_tracker;
pub mod map_session;
pub mod sync_engine;
pub mod version_reconciler;
pub mod worker_service;

pub use archive_import::{ArchiveImporter, ImportOutcome, ImportSource, ImportState};
pub use layer_registry::LayerRegistry;
pub use location_tracker::LocationTracker;
pub use map_session::{MapSession, StartupSelection};
pub use sync_engine::{SyncEngine, SyncStatus};
pub use version_reconciler::{UpdateCheck, VersionReconciler};
pub use worker_service::WorkerService;
