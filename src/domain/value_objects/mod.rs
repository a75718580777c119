pub mod archive_version;
pub mod cache_key;
pub mod coordinates;
pub mod pending_update_id;
pub mod worker_id;

pub use archive_version::ArchiveVersion;
pub use cache_key::CacheKey;
pub use coordinates::{Coordinates, GeoBounds};
pub use pending_update_id::PendingUpdateId;
pub use worker_id::WorkerId;
