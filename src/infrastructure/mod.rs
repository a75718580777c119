pub mod database;
pub mod jobs;
pub mod network;
pub mod pmtiles;
pub mod remote;
pub mod storage;
