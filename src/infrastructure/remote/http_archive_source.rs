use crate::application::ports::ArchiveSource;
use crate::domain::entities::ArchiveInfo;
use crate::infrastructure::pmtiles::{ArchiveMetadata, PmtilesHeader, archive_info};
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::time::Duration;

/// Size of the first range request. Header and metadata of most archives fit in it.
const INITIAL_FETCH_LEN: u64 = 16 * 1024;

/// Reads archives over HTTP. Inspection uses range requests so a raster/vector decision
/// can be made before anything large is transferred.
#[derive(Clone)]
pub struct HttpArchiveSource {
    http: reqwest::Client,
}

impl HttpArchiveSource {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// `end` is exclusive. Servers that ignore `Range` answer 200 with the full body, which
    /// is sliced locally.
    async fn fetch_range(&self, url: &str, start: u64, end: u64) -> Result<Bytes, AppError> {
        let resp = self
            .http
            .get(url)
            .header(RANGE, format!("bytes={}-{}", start, end.saturating_sub(1)))
            .send()
            .await
            .map_err(|e| AppError::Unreachable(format!("{url}: {e}")))?;

        let status = resp.status();
        if status != StatusCode::PARTIAL_CONTENT && status != StatusCode::OK {
            return Err(AppError::Unreachable(format!("{url}: HTTP {status}")));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| AppError::Unreachable(format!("{url}: {e}")))?;

        if status == StatusCode::OK {
            let len = body.len() as u64;
            let from = start.min(len) as usize;
            let to = end.min(len) as usize;
            return Ok(body.slice(from..to));
        }
        Ok(body)
    }
}

#[async_trait]
impl ArchiveSource for HttpArchiveSource {
    async fn inspect(&self, url: &str) -> Result<ArchiveInfo, AppError> {
        let head = self.fetch_range(url, 0, INITIAL_FETCH_LEN).await?;
        let header = PmtilesHeader::parse(&head)?;

        let range = header.metadata_range();
        let raw = if range.end <= head.len() as u64 {
            head.slice(range.start as usize..range.end as usize)
        } else {
            self.fetch_range(url, range.start, range.end).await?
        };
        if (raw.len() as u64) < header.metadata_length {
            return Err(AppError::ValidationError(format!(
                "{url}: metadata block truncated"
            )));
        }

        let metadata = ArchiveMetadata::decode(&header, &raw)?;
        tracing::debug!(
            target: "offline::import",
            url,
            format = metadata.format.as_deref().unwrap_or("unknown"),
            "archive inspected"
        );
        archive_info(&header, &metadata)
    }

    async fn download(&self, url: &str) -> Result<Bytes, AppError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Network(format!("{url}: HTTP {status}")));
        }
        Ok(resp.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::pmtiles::HEADER_LEN;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn raster_archive() -> Vec<u8> {
        let metadata = br#"{"name":"valley","format":"png","version":"4"}"#;
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0..7].copy_from_slice(b"PMTiles");
        bytes[7] = 3;
        bytes[24..32].copy_from_slice(&(HEADER_LEN as u64).to_le_bytes());
        bytes[32..40].copy_from_slice(&(metadata.len() as u64).to_le_bytes());
        bytes[97] = 1;
        bytes[100] = 3;
        bytes[101] = 12;
        bytes[110..114].copy_from_slice(&10_000_000i32.to_le_bytes());
        bytes[114..118].copy_from_slice(&10_000_000i32.to_le_bytes());
        bytes.extend_from_slice(metadata);
        bytes.extend_from_slice(&[7u8; 64]);
        bytes
    }

    fn local_source() -> HttpArchiveSource {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpArchiveSource::with_client(http)
    }

    /// Serves one canned response per connection, ignoring any `Range` header.
    async fn serve(status_line: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    let head = format!(
                        "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/valley.pmtiles")
    }

    #[tokio::test]
    async fn inspects_archive_from_server_without_range_support() {
        let url = serve("200 OK", raster_archive()).await;
        let source = local_source();

        let info = source.inspect(&url).await.expect("inspect");
        assert_eq!(info.name.as_deref(), Some("valley"));
        assert_eq!(info.version.as_ref().map(|v| v.as_str()), Some("4"));
        assert!(!info.is_vector());

        let bytes = source.download(&url).await.expect("download");
        assert_eq!(bytes.len(), raster_archive().len());
    }

    #[tokio::test]
    async fn error_statuses_map_to_unreachable_and_network() {
        let url = serve("404 Not Found", b"missing".to_vec()).await;
        let source = local_source();

        assert!(matches!(
            source.inspect(&url).await,
            Err(AppError::Unreachable(_))
        ));
        assert!(matches!(
            source.download(&url).await,
            Err(AppError::Network(_))
        ));
    }
}
