pub mod archive;
pub mod layer;
pub mod pending_update;
pub mod sync_result;
pub mod worker;

pub use archive::{ArchiveInfo, ArchiveRecord};
pub use layer::{LayerEntry, LayerEvent, OverlayEntry, RasterLayer};
pub use pending_update::{PendingUpdate, PendingUpdateDraft};
pub use sync_result::SyncResult;
pub use worker::{WorkerRegistration, WorkerSummary};
