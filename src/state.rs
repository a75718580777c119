use crate::application::ports::{
    ArchiveSource, AssetStore, ImportConfirmer, LayerPreferences, LocationSink,
    PendingUpdateQueue, WorkerDirectory,
};
use crate::application::services::{
    ArchiveImporter, LayerRegistry, LocationTracker, MapSession, SyncEngine, VersionReconciler,
    WorkerService,
};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::jobs::{BackgroundScheduler, ScheduleConfig};
use crate::infrastructure::network::{ConnectivityMonitor, ReachabilityCheck};
use crate::infrastructure::remote::{HttpArchiveSource, TeamApiClient, UnconfiguredTeamApi};
use crate::infrastructure::storage::{
    SqliteAssetStore, SqliteLayerPreferences, SqlitePendingUpdateQueue,
};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;

/// Remote and user-facing collaborators. Swapped out in tests.
pub struct Collaborators {
    pub archive_source: Arc<dyn ArchiveSource>,
    pub location_sink: Arc<dyn LocationSink>,
    pub worker_directory: Arc<dyn WorkerDirectory>,
    pub confirmer: Arc<dyn ImportConfirmer>,
    pub connectivity: ConnectivityMonitor,
    /// Polled by the scheduler to keep `connectivity` current.
    pub reachability: Option<Arc<dyn ReachabilityCheck>>,
}

impl Collaborators {
    /// HTTP collaborators built from `config`. Without a team API URL, location samples stay
    /// queued and worker calls fail with a configuration error.
    pub fn from_config(
        config: &AppConfig,
        confirmer: Arc<dyn ImportConfirmer>,
        connectivity: ConnectivityMonitor,
    ) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.team.request_timeout_secs);
        let archive_source: Arc<dyn ArchiveSource> = Arc::new(HttpArchiveSource::new(timeout)?);

        let (location_sink, worker_directory, reachability): (
            Arc<dyn LocationSink>,
            Arc<dyn WorkerDirectory>,
            Option<Arc<dyn ReachabilityCheck>>,
        ) = match &config.team.api_base_url {
            Some(url) => {
                let client = Arc::new(TeamApiClient::new(url, timeout)?);
                let sink: Arc<dyn LocationSink> = client.clone();
                let directory: Arc<dyn WorkerDirectory> = client.clone();
                let check: Arc<dyn ReachabilityCheck> = client;
                (sink, directory, Some(check))
            }
            None => {
                tracing::warn!(
                    target: "team::workers",
                    "team API URL not configured; location samples will stay queued"
                );
                let stub = Arc::new(UnconfiguredTeamApi);
                let sink: Arc<dyn LocationSink> = stub.clone();
                let directory: Arc<dyn WorkerDirectory> = stub;
                (sink, directory, None)
            }
        };

        Ok(Self {
            archive_source,
            location_sink,
            worker_directory,
            confirmer,
            connectivity,
            reachability,
        })
    }
}

/// Owns every store and service for the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub connectivity: ConnectivityMonitor,
    pub reachability: Option<Arc<dyn ReachabilityCheck>>,
    pub asset_store: Arc<dyn AssetStore>,
    pub pending_queue: Arc<dyn PendingUpdateQueue>,
    pub preferences: Arc<dyn LayerPreferences>,
    pub layer_registry: Arc<LayerRegistry>,
    pub version_reconciler: Arc<VersionReconciler>,
    pub archive_importer: Arc<ArchiveImporter>,
    pub map_session: Arc<MapSession>,
    pub sync_engine: Arc<SyncEngine>,
    pub location_tracker: Arc<LocationTracker>,
    pub worker_service: Arc<WorkerService>,
}

impl AppState {
    pub async fn initialize(
        config: AppConfig,
        confirmer: Arc<dyn ImportConfirmer>,
        connectivity: ConnectivityMonitor,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;
        tokio::fs::create_dir_all(&config.storage.data_dir).await?;

        let pool = ConnectionPool::new(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.connection_timeout),
        )
        .await?;
        pool.migrate().await?;

        let collaborators = Collaborators::from_config(&config, confirmer, connectivity)?;
        Ok(Self::with_collaborators(config, pool, collaborators))
    }

    /// Wires services over an already migrated pool.
    pub fn with_collaborators(
        config: AppConfig,
        pool: ConnectionPool,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            archive_source,
            location_sink,
            worker_directory,
            confirmer,
            connectivity,
            reachability,
        } = collaborators;

        let asset_store: Arc<dyn AssetStore> = Arc::new(SqliteAssetStore::new(pool.clone()));
        let pending_queue: Arc<dyn PendingUpdateQueue> =
            Arc::new(SqlitePendingUpdateQueue::new(pool.clone()));
        let preferences: Arc<dyn LayerPreferences> =
            Arc::new(SqliteLayerPreferences::new(pool.clone()));

        let layer_registry = Arc::new(LayerRegistry::new(
            asset_store.clone(),
            preferences.clone(),
        ));
        let version_reconciler = Arc::new(VersionReconciler::new(
            asset_store.clone(),
            archive_source.clone(),
        ));
        let archive_importer = Arc::new(ArchiveImporter::new(
            asset_store.clone(),
            archive_source.clone(),
            layer_registry.clone(),
            confirmer,
            connectivity.clone(),
        ));
        let map_session = Arc::new(MapSession::new(
            layer_registry.clone(),
            version_reconciler.clone(),
            archive_source,
            preferences.clone(),
            connectivity.clone(),
        ));

        let sync_engine = SyncEngine::new(
            pending_queue.clone(),
            location_sink,
            config.sync.retention(),
        );
        let location_tracker = Arc::new(LocationTracker::new(
            pending_queue.clone(),
            sync_engine.clone(),
            connectivity.clone(),
            config.sync.auto_sync,
        ));
        let worker_service = Arc::new(WorkerService::new(
            worker_directory,
            location_tracker.clone(),
            location_tracker.clone(),
            config.team.registration_fix_timeout(),
        ));

        Self {
            config,
            pool,
            connectivity,
            reachability,
            asset_store,
            pending_queue,
            preferences,
            layer_registry,
            version_reconciler,
            archive_importer,
            map_session,
            sync_engine,
            location_tracker,
            worker_service,
        }
    }

    pub fn scheduler(&self) -> BackgroundScheduler {
        let workers = self
            .config
            .team
            .api_base_url
            .is_some()
            .then(|| self.worker_service.clone());

        let scheduler = BackgroundScheduler::new(
            self.sync_engine.clone(),
            workers,
            self.connectivity.clone(),
            ScheduleConfig {
                flush_interval: Duration::from_secs(self.config.sync.sync_interval_secs),
                sweep_interval: Duration::from_secs(self.config.sync.sweep_interval_secs),
                worker_refresh_interval: Duration::from_secs(
                    self.config.team.worker_refresh_interval_secs,
                ),
                connectivity_check_interval: Duration::from_secs(
                    self.config.team.connectivity_check_interval_secs,
                ),
            },
        );
        match &self.reachability {
            Some(check) => scheduler.with_reachability(check.clone()),
            None => scheduler,
        }
    }

    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}
