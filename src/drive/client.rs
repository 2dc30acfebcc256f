//! Drive API Client
//!
//! Provides access to the drive REST API: paginated entry listings, single
//! entry models and folder paths. Failures are reported to the caller as-is;
//! the client never retries on its own.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::DriveError;
use super::types::{
    DriveEntry, DriveFolder, EntriesPaginationResponse, EntryModelResponse, FolderPathResponse,
};

/// Header carrying the id of the viewing user
pub const VIEWER_HEADER: &str = "x-drive-user";

/// HTTP client timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of recent errors to track
const MAX_ERROR_HISTORY: usize = 10;

/// Health status values
pub const HEALTH_HEALTHY: u8 = 0;
pub const HEALTH_DEGRADED: u8 = 1;
pub const HEALTH_UNHEALTHY: u8 = 2;

/// A recent error entry for tracking
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub timestamp: u64,
    pub operation: String,
    pub path: String,
    pub error: String,
}

/// Drive API client
#[derive(Clone)]
pub struct DriveClient {
    /// HTTP client for making requests
    http_client: Client,
    /// API root, without trailing slash
    base_url: String,
    /// User the server should compute permissions for
    viewer: Option<u64>,
    /// Connection health (0=healthy, 1=degraded, 2=unhealthy)
    health: Arc<AtomicU8>,
    /// Recent error log
    error_log: Arc<RwLock<VecDeque<ErrorEntry>>>,
}

impl DriveClient {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, DriveError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DriveError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            viewer: None,
            health: Arc::new(AtomicU8::new(HEALTH_HEALTHY)),
            error_log: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_ERROR_HISTORY))),
        })
    }

    /// Send requests on behalf of `user_id`
    pub fn with_viewer(mut self, user_id: Option<u64>) -> Self {
        self.viewer = user_id;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of entries
    ///
    /// # Arguments
    /// * `params` - Query parameters, including `page`
    pub async fn fetch_entries<Q>(&self, params: &Q) -> Result<EntriesPaginationResponse, DriveError>
    where
        Q: Serialize + ?Sized,
    {
        let path = "drive/file-entries";
        let request = self.http_client.get(self.url(path)).query(params);
        self.send_json("fetch_entries", path, request).await
    }

    /// Fetch the current full record of a single entry
    pub async fn fetch_entry_model(&self, id: u64) -> Result<DriveEntry, DriveError> {
        let path = format!("drive/file-entries/{}/model", id);
        let request = self.http_client.get(self.url(&path));
        let response: EntryModelResponse = self.send_json("fetch_entry_model", &path, request).await?;
        Ok(response.file_entry)
    }

    /// Fetch the root-first ancestor chain of a folder
    ///
    /// # Arguments
    /// * `hash` - Folder hash or numeric id
    /// * `link` - Optional shareable link token the folder is viewed through
    pub async fn fetch_folder_path(
        &self,
        hash: &str,
        link: Option<&str>,
    ) -> Result<Vec<DriveFolder>, DriveError> {
        let path = format!("drive/folders/{}/path", urlencoding::encode(hash));
        let mut request = self.http_client.get(self.url(&path));
        if let Some(link) = link {
            request = request.query(&[("shareable_link", link)]);
        }
        let response: FolderPathResponse = self.send_json("fetch_folder_path", &path, request).await?;
        Ok(response.path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request and decode its JSON body, recording failures
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        mut request: RequestBuilder,
    ) -> Result<T, DriveError> {
        if let Some(viewer) = self.viewer {
            request = request.header(VIEWER_HEADER, viewer.to_string());
        }

        debug!(operation = operation, path = path, "Sending drive request");

        let result = execute::<T>(request).await;

        match &result {
            Ok(_) => self.health.store(HEALTH_HEALTHY, Ordering::Relaxed),
            Err(e) => {
                if e.is_transport() {
                    self.health.store(HEALTH_UNHEALTHY, Ordering::Relaxed);
                } else if matches!(e, DriveError::Server(_, _)) {
                    self.health.store(HEALTH_DEGRADED, Ordering::Relaxed);
                }
                warn!(operation = operation, path = path, error = %e, "Drive request failed");
                self.log_error(operation, path, &e.to_string());
            }
        }

        result
    }

    /// Log an error to the error history ring buffer
    fn log_error(&self, operation: &str, path: &str, error: &str) {
        let entry = ErrorEntry {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            operation: operation.to_string(),
            path: path.to_string(),
            error: error.to_string(),
        };

        let mut log = self.error_log.write().unwrap_or_else(|e| e.into_inner());
        if log.len() >= MAX_ERROR_HISTORY {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// Get connection health status string
    pub fn health_status(&self) -> &'static str {
        match self.health.load(Ordering::Relaxed) {
            HEALTH_HEALTHY => "healthy",
            HEALTH_DEGRADED => "degraded",
            _ => "unhealthy",
        }
    }

    /// Get recent errors
    pub fn recent_errors(&self) -> Vec<ErrorEntry> {
        self.error_log
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, DriveError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DriveError::from_status(status.as_u16(), &body));
    }
    Ok(response.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = DriveClient::new("http://localhost:8080/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(
            client.url("drive/file-entries"),
            "http://localhost:8080/api/drive/file-entries"
        );
    }

    #[test]
    fn test_error_history_is_bounded() {
        let client = DriveClient::new("http://localhost:1").unwrap();
        for i in 0..(MAX_ERROR_HISTORY + 3) {
            client.log_error("fetch_entries", &format!("p{}", i), "boom");
        }
        let errors = client.recent_errors();
        assert_eq!(errors.len(), MAX_ERROR_HISTORY);
        assert_eq!(errors[0].path, "p3");
    }

    #[tokio::test]
    async fn test_transport_failure_marks_unhealthy() {
        // Nothing listens on port 1
        let client = DriveClient::new("http://127.0.0.1:1").unwrap();
        let err = client.fetch_entry_model(7).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(client.health_status(), "unhealthy");
        assert_eq!(client.recent_errors()[0].operation, "fetch_entry_model");
    }
}
