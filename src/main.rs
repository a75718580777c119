use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use gpsmap_lib::application::ports::{AutoConfirm, DownloadPrompt, ImportConfirmer};
use gpsmap_lib::application::services::{
    ImportOutcome, ImportSource, StartupSelection, UpdateCheck,
};
use gpsmap_lib::domain::value_objects::{CacheKey, Coordinates, WorkerId};
use gpsmap_lib::infrastructure::network::ConnectivityMonitor;
use gpsmap_lib::shared::config::AppConfig;
use gpsmap_lib::shared::format::format_size;
use gpsmap_lib::{AppState, init_logging};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "gpsmap")]
#[command(about = "Offline map archive cache and team location sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database URL
    #[arg(long, env = "GPSMAP_DATABASE_URL")]
    database_url: Option<String>,

    /// Base URL of the team server
    #[arg(long, env = "GPSMAP_API_BASE_URL")]
    api_url: Option<String>,

    /// Start offline; `run` goes back online once the team server answers
    #[arg(long)]
    offline: bool,

    /// Answer yes to download prompts
    #[arg(short, long)]
    yes: bool,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an archive from a local file or URL
    Import { source: String },
    /// List stored archives
    List,
    /// Delete a stored archive
    Remove { key: String },
    /// Make a stored archive the base layer
    Activate { key: String },
    /// Select the startup map the way the viewer does
    Open {
        /// Archive URL or key; the remembered layer is used when omitted
        map: Option<String>,
        /// Save a previewed remote archive
        #[arg(long)]
        save: bool,
        /// Download a newer version when one is available
        #[arg(long)]
        update: bool,
    },
    /// Compare a stored archive with its remote version
    Check { key: String },
    /// Add a GeoJSON overlay and report what it contains
    Overlay { path: PathBuf },
    /// Record a position fix for a worker
    Fix {
        #[arg(long)]
        worker: String,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Deliver queued location samples
    Flush,
    /// Delete synced samples past the retention window
    Sweep,
    /// Register a new worker
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// List workers known to the team server
    Workers,
    /// Run the background scheduler until Ctrl+C
    Run,
}

struct StdinConfirmer;

#[async_trait]
impl ImportConfirmer for StdinConfirmer {
    async fn confirm_download(&self, prompt: &DownloadPrompt) -> bool {
        let question = if prompt.replaces_existing {
            format!(
                "Replace the stored copy of {} with a {} download? [y/N] ",
                prompt.name, prompt.size_label
            )
        } else {
            format!("Download {} ({})? [y/N] ", prompt.name, prompt.size_label)
        };

        tokio::task::spawn_blocking(move || {
            print!("{question}");
            let _ = std::io::stdout().flush();
            let mut answer = String::new();
            if std::io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let mut config = AppConfig::from_env();
    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(url) = &cli.api_url {
        config.team.api_base_url = Some(url.trim_end_matches('/').to_string());
    }

    let confirmer: Arc<dyn ImportConfirmer> = if cli.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(StdinConfirmer)
    };
    let connectivity = ConnectivityMonitor::new(!cli.offline);

    let state = AppState::initialize(config, confirmer, connectivity)
        .await
        .context("failed to initialize application state")?;
    info!(version = env!("CARGO_PKG_VERSION"), "gpsmap started");

    let result = dispatch(&state, cli.command).await;
    state.shutdown().await;
    result
}

async fn dispatch(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Import { source } => import(state, &source).await,
        Commands::List => list(state).await,
        Commands::Remove { key } => {
            let key = parse_key(&key)?;
            state.layer_registry.sync().await?;
            if state.layer_registry.remove(&key).await? {
                println!("Removed {key}");
            } else {
                println!("Nothing stored under {key}");
            }
            Ok(())
        }
        Commands::Activate { key } => {
            let key = parse_key(&key)?;
            state.layer_registry.sync().await?;
            state.layer_registry.activate(&key).await?;
            println!("Active base layer: {key}");
            Ok(())
        }
        Commands::Open { map, save, update } => open(state, map.as_deref(), save, update).await,
        Commands::Check { key } => {
            let key = parse_key(&key)?;
            match state.version_reconciler.check_remote(&key).await? {
                UpdateCheck::UpToDate => println!("{key} is up to date"),
                UpdateCheck::UpdateAvailable(info) => println!(
                    "{key}: version {} available",
                    info.version.as_ref().map(|v| v.as_str()).unwrap_or("(none)")
                ),
            }
            Ok(())
        }
        Commands::Overlay { path } => {
            let raw = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let document: serde_json::Value = serde_json::from_slice(&raw)?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "overlay".to_string());
            let overlay = state.layer_registry.add_overlay(&stem, document).await?;
            println!("{}: {} feature(s)", overlay.name, overlay.feature_count);
            Ok(())
        }
        Commands::Fix {
            worker,
            latitude,
            longitude,
        } => {
            let worker = WorkerId::new(worker).map_err(|e| anyhow!(e))?;
            let update = state
                .location_tracker
                .on_fix(&worker, latitude, longitude)
                .await?;
            // the tracker's flush runs in the background; finish it before exiting
            if state.connectivity.is_online() {
                state.sync_engine.flush_logged().await;
            }
            println!("Queued update {} for {}", update.id, update.worker_id);
            Ok(())
        }
        Commands::Flush => {
            if !state.connectivity.is_online() {
                return Err(anyhow!("Cannot sync while offline"));
            }
            let result = state.sync_engine.flush().await?;
            println!(
                "synced {} / failed {} / pending {}",
                result.synced_count, result.failed_count, result.pending_count
            );
            Ok(())
        }
        Commands::Sweep => {
            let removed = state.sync_engine.sweep_expired(chrono::Utc::now()).await?;
            println!("Removed {removed} synced sample(s)");
            Ok(())
        }
        Commands::Register { name, email } => {
            state.map_session.open(None).await?;
            let fallback = state
                .layer_registry
                .view_center()
                .await
                .unwrap_or_else(Coordinates::origin);
            let registration = state
                .worker_service
                .register(&name, &email, fallback)
                .await?;
            if state.connectivity.is_online() {
                state.sync_engine.flush_logged().await;
            }
            println!("Registered {} as {}", registration.name, registration.worker_id);
            Ok(())
        }
        Commands::Workers => {
            let workers = state.worker_service.refresh_workers().await?;
            if workers.is_empty() {
                println!("No workers registered");
            }
            for worker in workers {
                let location = worker
                    .last_location
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "no location".to_string());
                println!("{}  {} <{}>  {}", worker.worker_id, worker.name, worker.email, location);
            }
            Ok(())
        }
        Commands::Run => {
            let cancel = CancellationToken::new();
            let handles = state.scheduler().spawn(cancel.clone());
            info!("scheduler running; press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
            cancel.cancel();
            for handle in handles {
                let _ = handle.await;
            }
            Ok(())
        }
    }
}

fn parse_key(raw: &str) -> Result<CacheKey> {
    let key = if raw.starts_with("http://") || raw.starts_with("https://") {
        CacheKey::from_url(raw)
    } else {
        CacheKey::new(raw.to_string())
    };
    key.map_err(|e| anyhow!(e))
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

async fn import(state: &AppState, source: &str) -> Result<()> {
    let import_source = if source.starts_with("http://") || source.starts_with("https://") {
        ImportSource::Remote {
            url: source.to_string(),
        }
    } else {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read {source}"))?;
        ImportSource::Local {
            file_name: source.to_string(),
            bytes: Bytes::from(bytes),
        }
    };
    run_import(state, import_source).await
}

async fn run_import(state: &AppState, source: ImportSource) -> Result<()> {
    let cancel = cancel_on_ctrl_c();
    match state.archive_importer.import(source, &cancel).await? {
        ImportOutcome::Imported {
            key,
            name,
            replaced,
        } => {
            let verb = if replaced { "Updated" } else { "Imported" };
            println!("{verb} {name} as {key}");
        }
        ImportOutcome::Rejected { reason } => println!("Rejected: {reason}"),
        ImportOutcome::Cancelled => println!("Import cancelled"),
    }
    Ok(())
}

async fn list(state: &AppState) -> Result<()> {
    let active = state.preferences.active_layer().await?;
    let archives: Vec<_> = state.asset_store.list_all().try_collect().await?;
    if archives.is_empty() {
        println!("No archives stored");
    }
    for (key, record) in archives {
        let marker = if active.as_ref() == Some(&key) { "*" } else { " " };
        println!(
            "{marker} {}  [{}]  z{}-{}  v{}  {}",
            record.label(),
            key,
            record.min_zoom,
            record.max_zoom,
            record.version.as_ref().map(|v| v.as_str()).unwrap_or("-"),
            format_size(record.payload_len())
        );
    }
    Ok(())
}

async fn open(state: &AppState, map: Option<&str>, save: bool, update: bool) -> Result<()> {
    match state.map_session.open(map).await? {
        StartupSelection::Activated { key, update: info } => {
            println!("Active base layer: {key}");
            if let Some(info) = info {
                let version = info.version.as_ref().map(|v| v.as_str()).unwrap_or("(none)");
                println!("A newer version ({version}) is available");
                if update {
                    run_import(state, ImportSource::Remote { url: key.to_string() }).await?;
                }
            }
        }
        StartupSelection::Preview { key, info } => {
            println!(
                "Previewing {} ({})",
                info.name.as_deref().unwrap_or(key.as_str()),
                format_size(info.tile_data_length)
            );
            if save {
                run_import(state, ImportSource::Remote { url: key.to_string() }).await?;
            }
        }
        StartupSelection::Rejected { key, reason } => println!("{key} rejected: {reason}"),
        StartupSelection::Unavailable { key, reason } => println!("{key} unavailable: {reason}"),
        StartupSelection::Remembered { key } => println!("Active base layer: {key}"),
        StartupSelection::NoneSelected => println!("No map selected"),
    }
    Ok(())
}
