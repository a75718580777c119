use crate::application::services::{SyncEngine, WorkerService};
use crate::infrastructure::network::{ConnectivityMonitor, ReachabilityCheck};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub flush_interval: Duration,
    pub sweep_interval: Duration,
    pub worker_refresh_interval: Duration,
    pub connectivity_check_interval: Duration,
}

/// Periodic flush, retention sweep and roster refresh, plus a flush whenever connectivity
/// comes back. With a reachability check attached, connectivity itself is polled. Every
/// task calls the same entry points as foreground code and only logs failures.
pub struct BackgroundScheduler {
    engine: Arc<SyncEngine>,
    workers: Option<Arc<WorkerService>>,
    connectivity: ConnectivityMonitor,
    reachability: Option<Arc<dyn ReachabilityCheck>>,
    config: ScheduleConfig,
}

impl BackgroundScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        workers: Option<Arc<WorkerService>>,
        connectivity: ConnectivityMonitor,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            engine,
            workers,
            connectivity,
            reachability: None,
            config,
        }
    }

    pub fn with_reachability(mut self, check: Arc<dyn ReachabilityCheck>) -> Self {
        self.reachability = Some(check);
        self
    }

    pub fn spawn(self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = vec![
            tokio::spawn(flush_loop(
                self.engine.clone(),
                self.connectivity.clone(),
                self.config.flush_interval,
                cancel.clone(),
            )),
            tokio::spawn(sweep_loop(
                self.engine.clone(),
                self.config.sweep_interval,
                cancel.clone(),
            )),
            tokio::spawn(reconnect_loop(
                self.engine.clone(),
                self.connectivity.clone(),
                cancel.clone(),
            )),
        ];
        if let Some(check) = self.reachability {
            handles.push(tokio::spawn(connectivity_loop(
                check,
                self.connectivity.clone(),
                self.config.connectivity_check_interval,
                cancel.clone(),
            )));
        }
        if let Some(workers) = self.workers {
            handles.push(tokio::spawn(refresh_loop(
                workers,
                self.connectivity.clone(),
                self.config.worker_refresh_interval,
                cancel,
            )));
        }
        tracing::info!(
            target: "jobs::scheduler",
            tasks = handles.len(),
            flush_secs = self.config.flush_interval.as_secs(),
            sweep_secs = self.config.sweep_interval.as_secs(),
            "background scheduler started"
        );
        handles
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn flush_once_with_log(engine: &SyncEngine, trigger: &str) {
    if let Err(err) = engine.flush().await {
        tracing::error!(target: "jobs::scheduler", error = %err, trigger, "location flush failed");
    }
}

async fn flush_loop(
    engine: Arc<SyncEngine>,
    connectivity: ConnectivityMonitor,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if connectivity.is_online() {
                    flush_once_with_log(&engine, "interval").await;
                }
            }
        }
    }
}

async fn sweep_loop(engine: Arc<SyncEngine>, period: Duration, cancel: CancellationToken) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(err) = engine.sweep_expired(Utc::now()).await {
                    tracing::error!(target: "jobs::scheduler", error = %err, "retention sweep failed");
                }
            }
        }
    }
}

async fn reconnect_loop(
    engine: Arc<SyncEngine>,
    connectivity: ConnectivityMonitor,
    cancel: CancellationToken,
) {
    let mut rx = connectivity.subscribe();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *rx.borrow_and_update();
                if online {
                    flush_once_with_log(&engine, "reconnect").await;
                }
            }
        }
    }
}

async fn connectivity_loop(
    check: Arc<dyn ReachabilityCheck>,
    connectivity: ConnectivityMonitor,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let online = tokio::select! {
                    _ = cancel.cancelled() => break,
                    online = check.is_reachable() => online,
                };
                connectivity.set_online(online);
            }
        }
    }
}

async fn refresh_loop(
    workers: Arc<WorkerService>,
    connectivity: ConnectivityMonitor,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if !connectivity.is_online() {
                    continue;
                }
                if let Err(err) = workers.refresh_workers().await {
                    tracing::warn!(target: "jobs::scheduler", error = %err, "worker refresh failed");
                }
            }
        }
    }
}
