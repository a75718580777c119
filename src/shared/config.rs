use crate::domain::constants::LOCATION_RETENTION_DAYS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DATA_DIR_NAME: &str = "gpsmap";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub team: TeamConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
    pub retention_days: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub registration_fix_timeout_secs: u64,
    pub worker_refresh_interval_secs: u64,
    pub connectivity_check_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database: DatabaseConfig {
                url: database_url_for(&data_dir),
                max_connections: 5,
                connection_timeout: 30,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval_secs: 60,
                retention_days: LOCATION_RETENTION_DAYS as u64,
                sweep_interval_secs: 24 * 60 * 60,
            },
            team: TeamConfig {
                api_base_url: None,
                request_timeout_secs: 15,
                registration_fix_timeout_secs: 5,
                worker_refresh_interval_secs: 30,
                connectivity_check_interval_secs: 15,
            },
            storage: StorageConfig { data_dir },
        }
    }
}

impl SyncConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }
}

impl TeamConfig {
    pub fn registration_fix_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_fix_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("GPSMAP_DATA_DIR") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.storage.data_dir = trimmed.to_string();
                cfg.database.url = database_url_for(trimmed);
            }
        }
        if let Ok(v) = std::env::var("GPSMAP_DATABASE_URL") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.database.url = trimmed.to_string();
            }
        }
        if let Ok(v) = std::env::var("GPSMAP_DB_MAX_CONNECTIONS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.database.max_connections = value.min(u64::from(u32::MAX)) as u32;
        }

        if let Ok(v) = std::env::var("GPSMAP_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("GPSMAP_SYNC_INTERVAL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.sync_interval_secs = value.max(1);
        }
        if let Ok(v) = std::env::var("GPSMAP_RETENTION_DAYS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.retention_days = value;
        }
        if let Ok(v) = std::env::var("GPSMAP_SWEEP_INTERVAL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.sweep_interval_secs = value.max(1);
        }

        if let Ok(v) = std::env::var("GPSMAP_API_BASE_URL") {
            let trimmed = v.trim();
            cfg.team.api_base_url = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.trim_end_matches('/').to_string())
            };
        }
        if let Ok(v) = std::env::var("GPSMAP_REQUEST_TIMEOUT_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.team.request_timeout_secs = value.max(1);
        }
        if let Ok(v) = std::env::var("GPSMAP_FIX_TIMEOUT_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.team.registration_fix_timeout_secs = value;
        }
        if let Ok(v) = std::env::var("GPSMAP_WORKER_REFRESH_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.team.worker_refresh_interval_secs = value.max(1);
        }
        if let Ok(v) = std::env::var("GPSMAP_CONNECTIVITY_CHECK_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.team.connectivity_check_interval_secs = value.max(1);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.sync_interval_secs == 0 {
            return Err("Sync interval must be greater than 0".to_string());
        }
        if self.sync.retention_days == 0 {
            return Err("Sync retention_days must be greater than 0".to_string());
        }
        if let Some(url) = &self.team.api_base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(format!("Team api_base_url must be an http(s) URL: {url}"));
        }
        Ok(())
    }
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .to_string_lossy()
        .into_owned()
}

fn database_url_for(data_dir: &str) -> String {
    format!("sqlite:{data_dir}/gpsmap.db?mode=rwc")
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
