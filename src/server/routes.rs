//! HTTP server for the drive API
//!
//! Routes requests to the entry index, entry models and the folder path
//! resolver. The viewer is named by the `x-drive-user` header.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::index::EntryIndex;
use super::path::FolderPathResolver;
use super::permissions::SetPermissions;
use super::policy::{now_secs, FolderPolicy};
use super::store::MemoryStore;
use crate::drive::client::VIEWER_HEADER;
use crate::drive::{DriveError, EntriesPaginationResponse, EntryModelResponse, FolderPathResponse};

/// Shared handler state
#[derive(Clone)]
struct AppState {
    store: Arc<MemoryStore>,
    index: Arc<EntryIndex>,
    resolver: Arc<FolderPathResolver>,
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    shareable_link: Option<String>,
}

/// Build the drive API router over `store`
pub fn router(store: Arc<MemoryStore>) -> Router {
    let state = AppState {
        index: Arc::new(EntryIndex::new(Arc::clone(&store))),
        resolver: Arc::new(FolderPathResolver::new(Arc::clone(&store))),
        store,
    };

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/drive/file-entries", get(list_entries))
        .route("/drive/file-entries/:id/model", get(entry_model))
        .route("/drive/folders/:hash/path", get(folder_path))
        .with_state(state)
}

/// Viewer named by the request, if any
fn viewer(headers: &HeaderMap) -> Result<Option<u64>, DriveError> {
    match headers.get(VIEWER_HEADER) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Some)
            .ok_or_else(|| DriveError::BadRequest(format!("Invalid {} header", VIEWER_HEADER))),
    }
}

async fn list_entries(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<EntriesPaginationResponse>, DriveError> {
    let viewer = viewer(&headers)?;
    debug!(viewer = ?viewer, params = ?params, "Listing entries");
    state.index.list(&params, viewer).map(Json)
}

async fn entry_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<EntryModelResponse>, DriveError> {
    let viewer = viewer(&headers)?;
    let entry = state
        .store
        .find_entry(&id)
        .ok_or_else(|| DriveError::NotFound(format!("Entry {} not found", id)))?;
    FolderPolicy::show(viewer, &entry, None, now_secs())?;

    Ok(Json(EntryModelResponse {
        file_entry: SetPermissions::execute(entry, viewer, None),
    }))
}

async fn folder_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(hash): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Json<FolderPathResponse>, DriveError> {
    let viewer = viewer(&headers)?;
    let link = query.shareable_link.as_deref().filter(|l| !l.is_empty());
    let path = state.resolver.resolve(&hash, link, viewer)?;
    Ok(Json(FolderPathResponse { path }))
}

/// HTTP server for the drive API
pub struct DriveServer {
    store: Arc<MemoryStore>,
    /// Bound listener
    listener: Option<TcpListener>,
}

impl DriveServer {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            listener: None,
        }
    }

    /// Bind the listener; returns the bound address
    pub async fn start(&mut self, addr: SocketAddr) -> Result<SocketAddr> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let local = listener.local_addr().context("Failed to read bound address")?;

        info!(addr = %local, "Drive server started");

        self.listener = Some(listener);
        Ok(local)
    }

    /// Serve requests until `shutdown` completes
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.listener.context("Server not started")?;

        axum::serve(listener, router(self.store))
            .with_graceful_shutdown(shutdown)
            .await
            .context("Drive server failed")?;

        info!("Drive server stopped");
        Ok(())
    }
}
