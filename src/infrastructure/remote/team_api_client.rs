use crate::application::ports::{LocationSink, WorkerDirectory};
use crate::domain::entities::{PendingUpdate, WorkerRegistration, WorkerSummary};
use crate::domain::value_objects::{Coordinates, WorkerId};
use crate::infrastructure::network::ReachabilityCheck;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterWorkerBody<'a> {
    worker_id: &'a str,
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationBody<'a> {
    worker_id: &'a str,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerWire {
    worker_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    last_location: Option<LatLngWire>,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LatLngWire {
    lat: f64,
    lng: f64,
}

/// JSON client for the team server's `/workers` and `/locations` endpoints.
#[derive(Clone)]
pub struct TeamApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl TeamApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::ConfigurationError(
                "Team API base URL is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.http.request(method, url)
    }
}

#[async_trait]
impl LocationSink for TeamApiClient {
    async fn deliver(&self, update: &PendingUpdate) -> Result<(), AppError> {
        let resp = self
            .request(Method::POST, "/locations")
            .json(&LocationBody {
                worker_id: update.worker_id.as_str(),
                latitude: update.position.latitude(),
                longitude: update.position.longitude(),
            })
            .send()
            .await?;
        ensure_success(resp, "location upload").await
    }
}

#[async_trait]
impl WorkerDirectory for TeamApiClient {
    async fn register(&self, registration: &WorkerRegistration) -> Result<(), AppError> {
        let resp = self
            .request(Method::POST, "/workers")
            .json(&RegisterWorkerBody {
                worker_id: registration.worker_id.as_str(),
                name: &registration.name,
                email: &registration.email,
            })
            .send()
            .await?;
        ensure_success(resp, "worker registration").await
    }

    async fn list_workers(&self) -> Result<Vec<WorkerSummary>, AppError> {
        let resp = self.request(Method::GET, "/workers").send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "worker listing failed: {status} - {body}"
            )));
        }
        parse_roster(&body)
    }
}

#[async_trait]
impl ReachabilityCheck for TeamApiClient {
    /// Any HTTP answer counts; only transport failures mean the server is out of reach.
    async fn is_reachable(&self) -> bool {
        match self.http.head(&self.base_url).send().await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(target: "team::workers", error = %err, "team server unreachable");
                false
            }
        }
    }
}

/// Stand-in used when no team server is configured. Location samples stay queued.
pub struct UnconfiguredTeamApi;

#[async_trait]
impl LocationSink for UnconfiguredTeamApi {
    async fn deliver(&self, _update: &PendingUpdate) -> Result<(), AppError> {
        Err(AppError::ConfigurationError(
            "Team API base URL is not configured".to_string(),
        ))
    }
}

#[async_trait]
impl WorkerDirectory for UnconfiguredTeamApi {
    async fn register(&self, _registration: &WorkerRegistration) -> Result<(), AppError> {
        Err(AppError::ConfigurationError(
            "Team API base URL is not configured".to_string(),
        ))
    }

    async fn list_workers(&self) -> Result<Vec<WorkerSummary>, AppError> {
        Err(AppError::ConfigurationError(
            "Team API base URL is not configured".to_string(),
        ))
    }
}

async fn ensure_success(resp: reqwest::Response, action: &str) -> Result<(), AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AppError::Network(format!("{action} failed: {status} - {body}")))
}

/// Entries with an unusable id or position are skipped rather than failing the whole roster.
fn parse_roster(body: &str) -> Result<Vec<WorkerSummary>, AppError> {
    let wire: Vec<WorkerWire> = serde_json::from_str(body)?;

    let workers = wire
        .into_iter()
        .filter_map(|entry| {
            let worker_id = match WorkerId::new(entry.worker_id) {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(target: "team::workers", error = %err, "skipping worker entry");
                    return None;
                }
            };
            let last_location = entry
                .last_location
                .and_then(|loc| Coordinates::new(loc.lat, loc.lng).ok());
            // the server reports 0 for workers that never sent a location
            let last_seen = entry
                .timestamp
                .filter(|ts| *ts > 0)
                .and_then(DateTime::<Utc>::from_timestamp_millis);

            Some(WorkerSummary {
                worker_id,
                name: entry.name,
                email: entry.email,
                last_location,
                last_seen,
            })
        })
        .collect();

    Ok(workers)
}
