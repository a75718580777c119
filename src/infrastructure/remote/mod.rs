pub mod http_archive_source;
pub mod team_api_client;

pub use http_archive_source::HttpArchiveSource;
pub use team_api_client::{TeamApiClient, UnconfiguredTeamApi};
