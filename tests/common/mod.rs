#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use gpsmap_lib::application::ports::{
    ArchiveSource, AssetStore, DownloadPrompt, ImportConfirmer, LocationSink, WorkerDirectory,
};
use gpsmap_lib::application::services::ArchiveImporter;
use gpsmap_lib::domain::entities::{
    ArchiveInfo, ArchiveRecord, PendingUpdate, WorkerRegistration, WorkerSummary,
};
use gpsmap_lib::domain::value_objects::{ArchiveVersion, CacheKey, GeoBounds};
use gpsmap_lib::infrastructure::database::ConnectionPool;
use gpsmap_lib::infrastructure::network::ConnectivityMonitor;
use gpsmap_lib::shared::config::AppConfig;
use gpsmap_lib::shared::error::AppError;
use gpsmap_lib::{AppState, Collaborators};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const RASTER_URL: &str = "https://maps.example.com/white_mountains.pmtiles";
pub const VECTOR_URL: &str = "https://maps.example.com/roads.pmtiles";

pub fn raster_info(version: Option<&str>) -> ArchiveInfo {
    ArchiveInfo {
        name: Some("White Mountains".into()),
        description: None,
        attribution: Some("USGS".into()),
        version: version.map(|v| ArchiveVersion::new(v.to_string()).unwrap()),
        format: Some("png".into()),
        has_vector_layers: false,
        bounds: GeoBounds::from_degrees(44.0, -72.0, 44.5, -71.0).unwrap(),
        min_zoom: 8,
        max_zoom: 15,
        tile_data_length: 2_500_000,
    }
}

pub fn vector_info() -> ArchiveInfo {
    ArchiveInfo {
        format: Some("pbf".into()),
        has_vector_layers: true,
        ..raster_info(Some("1"))
    }
}

/// Minimal PMTiles v3 archive with an uncompressed JSON metadata block.
pub fn pmtiles_bytes(metadata: &str) -> Bytes {
    let mut bytes = vec![0u8; 127];
    bytes[0..7].copy_from_slice(b"PMTiles");
    bytes[7] = 3;
    bytes[24..32].copy_from_slice(&127u64.to_le_bytes());
    bytes[32..40].copy_from_slice(&(metadata.len() as u64).to_le_bytes());
    bytes[64..72].copy_from_slice(&64u64.to_le_bytes());
    bytes[97] = 1;
    bytes[99] = 2;
    bytes[100] = 4;
    bytes[101] = 12;
    bytes[102..106].copy_from_slice(&(-730_000_000i32).to_le_bytes());
    bytes[106..110].copy_from_slice(&(430_000_000i32).to_le_bytes());
    bytes[110..114].copy_from_slice(&(-710_000_000i32).to_le_bytes());
    bytes[114..118].copy_from_slice(&(450_000_000i32).to_le_bytes());
    bytes.extend_from_slice(metadata.as_bytes());
    bytes.extend_from_slice(&[0xAB; 64]);
    Bytes::from(bytes)
}

#[derive(Default)]
pub struct MockArchiveSource {
    archives: Mutex<HashMap<String, (ArchiveInfo, Bytes)>>,
    pub unreachable: Mutex<bool>,
    pub fail_download: Mutex<bool>,
    pub download_delay: Mutex<Option<Duration>>,
    pub inspect_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl MockArchiveSource {
    pub fn publish(&self, url: &str, info: ArchiveInfo, payload: &'static [u8]) {
        self.archives
            .lock()
            .unwrap()
            .insert(url.to_string(), (info, Bytes::from_static(payload)));
    }

    pub fn set_unreachable(&self, value: bool) {
        *self.unreachable.lock().unwrap() = value;
    }

    pub fn set_fail_download(&self, value: bool) {
        *self.fail_download.lock().unwrap() = value;
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn inspections(&self) -> usize {
        self.inspect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveSource for MockArchiveSource {
    async fn inspect(&self, url: &str) -> Result<ArchiveInfo, AppError> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        if *self.unreachable.lock().unwrap() {
            return Err(AppError::Unreachable(format!("{url}: connection refused")));
        }
        self.archives
            .lock()
            .unwrap()
            .get(url)
            .map(|(info, _)| info.clone())
            .ok_or_else(|| AppError::Unreachable(format!("{url}: HTTP 404 Not Found")))
    }

    async fn download(&self, url: &str) -> Result<Bytes, AppError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.download_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_download.lock().unwrap() {
            return Err(AppError::Network(format!("{url}: HTTP 500")));
        }
        self.archives
            .lock()
            .unwrap()
            .get(url)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| AppError::Network(format!("{url}: HTTP 404")))
    }
}

/// Wraps a real store; writes fail with a storage error once `fail_put` is set.
pub struct FailingPutStore {
    pub inner: Arc<dyn AssetStore>,
    pub fail_put: AtomicBool,
}

impl FailingPutStore {
    pub fn new(inner: Arc<dyn AssetStore>) -> Self {
        Self {
            inner,
            fail_put: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl AssetStore for FailingPutStore {
    async fn put(&self, key: &CacheKey, record: &ArchiveRecord) -> Result<(), AppError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::Storage("disk I/O error".into()));
        }
        self.inner.put(key, record).await
    }

    async fn get(&self, key: &CacheKey) -> Result<ArchiveRecord, AppError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), AppError> {
        self.inner.delete(key).await
    }

    async fn contains(&self, key: &CacheKey) -> Result<bool, AppError> {
        self.inner.contains(key).await
    }

    fn list_all(&self) -> BoxStream<'_, Result<(CacheKey, ArchiveRecord), AppError>> {
        self.inner.list_all()
    }
}

/// Importer over `store` sharing the harness registry, source, confirmer and connectivity.
pub fn importer_with_store(h: &Harness, store: Arc<dyn AssetStore>) -> ArchiveImporter {
    ArchiveImporter::new(
        store,
        h.source.clone(),
        h.state.layer_registry.clone(),
        h.confirmer.clone(),
        h.connectivity.clone(),
    )
}

/// Accepts every sample except the ids in `reject`.
#[derive(Default)]
pub struct RecordingSink {
    pub reject: Mutex<HashSet<i64>>,
    pub delivered: Mutex<Vec<PendingUpdate>>,
}

impl RecordingSink {
    pub fn reject_id(&self, id: i64) {
        self.reject.lock().unwrap().insert(id);
    }

    pub fn delivered_ids(&self) -> Vec<i64> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.id.value())
            .collect()
    }
}

#[async_trait]
impl LocationSink for RecordingSink {
    async fn deliver(&self, update: &PendingUpdate) -> Result<(), AppError> {
        if self.reject.lock().unwrap().contains(&update.id.value()) {
            return Err(AppError::Network("HTTP 503 Service Unavailable".into()));
        }
        self.delivered.lock().unwrap().push(update.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDirectory {
    pub registrations: Mutex<Vec<WorkerRegistration>>,
    pub roster: Mutex<Vec<WorkerSummary>>,
}

#[async_trait]
impl WorkerDirectory for MockDirectory {
    async fn register(&self, registration: &WorkerRegistration) -> Result<(), AppError> {
        self.registrations.lock().unwrap().push(registration.clone());
        Ok(())
    }

    async fn list_workers(&self) -> Result<Vec<WorkerSummary>, AppError> {
        Ok(self.roster.lock().unwrap().clone())
    }
}

/// Answers every prompt with `answer` and remembers what was asked.
pub struct ScriptedConfirmer {
    pub answer: bool,
    pub prompts: Mutex<Vec<DownloadPrompt>>,
}

impl ScriptedConfirmer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ImportConfirmer for ScriptedConfirmer {
    async fn confirm_download(&self, prompt: &DownloadPrompt) -> bool {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.answer
    }
}

pub struct Harness {
    pub state: AppState,
    pub source: Arc<MockArchiveSource>,
    pub sink: Arc<RecordingSink>,
    pub directory: Arc<MockDirectory>,
    pub confirmer: Arc<ScriptedConfirmer>,
    pub connectivity: ConnectivityMonitor,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.auto_sync = false;
    config.team.registration_fix_timeout_secs = 0;
    config
}

pub async fn harness() -> Harness {
    harness_with(test_config(), memory_pool().await, true).await
}

pub async fn memory_pool() -> ConnectionPool {
    let pool = ConnectionPool::from_memory().await.expect("pool");
    pool.migrate().await.expect("migrate");
    pool
}

pub async fn file_pool(path: &std::path::Path) -> ConnectionPool {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = ConnectionPool::new(&url, 2, Duration::from_secs(5))
        .await
        .expect("pool");
    pool.migrate().await.expect("migrate");
    pool
}

pub async fn harness_with(config: AppConfig, pool: ConnectionPool, confirm: bool) -> Harness {
    let source = Arc::new(MockArchiveSource::default());
    let sink = Arc::new(RecordingSink::default());
    let directory = Arc::new(MockDirectory::default());
    let confirmer = Arc::new(ScriptedConfirmer::new(confirm));
    let connectivity = ConnectivityMonitor::new(true);

    let state = AppState::with_collaborators(
        config,
        pool,
        Collaborators {
            archive_source: source.clone(),
            location_sink: sink.clone(),
            worker_directory: directory.clone(),
            confirmer: confirmer.clone(),
            connectivity: connectivity.clone(),
            reachability: None,
        },
    );

    Harness {
        state,
        source,
        sink,
        directory,
        confirmer,
        connectivity,
    }
}
