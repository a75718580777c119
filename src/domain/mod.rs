pub mod constants;
pub mod entities;
pub mod value_objects;

pub use entities::{ArchiveInfo, ArchiveRecord, LayerEntry, LayerEvent, PendingUpdate};
pub use value_objects::{ArchiveVersion, CacheKey, Coordinates, GeoBounds, PendingUpdateId, WorkerId};
