pub mod header;

pub use header::{ArchiveMetadata, HEADER_LEN, PmtilesHeader, archive_info, inspect_bytes};
