//! HTTP trigger surface for ShopMirror
//!
//! Two jobs only: run a synchronization on demand and answer dashboard
//! queries over mirrored rows. The router is generic over the engine's
//! [`PageFetcher`] seam so handler tests run against a scripted fetcher.

use anyhow::anyhow;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mirror_common::{Installation, ResourceKind, SyncSummary};
use mirror_store::{Db, MirroredRecord};
use mirror_sync::{InstallationLookup, PageFetcher, RecordSink, SyncError, SyncOrchestrator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handler state
pub struct AppState<F> {
    pub db: Arc<Mutex<Db>>,
    pub orchestrator: Arc<SyncOrchestrator<F>>,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            orchestrator: self.orchestrator.clone(),
        }
    }
}

/// Build the router over any page-fetcher implementation
pub fn build_router<F: PageFetcher + 'static>(state: AppState<F>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/installations/:id/sync/:resource", post(run_sync::<F>))
        .route("/installations/:id/records", get(list_records::<F>))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Store seam that takes the database lock only for the duration of one
/// storage call
///
/// Runs for different installations interleave: page fetches happen with no
/// lock held, and WAL journaling keeps the short write sections from blocking
/// readers.
struct SharedDb(Arc<Mutex<Db>>);

impl SharedDb {
    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Db>> {
        self.0.lock().map_err(|_| anyhow!("database lock poisoned"))
    }
}

impl InstallationLookup for SharedDb {
    fn get_installation(&self, remote_id: &str) -> anyhow::Result<Option<Installation>> {
        self.lock()?.get_installation(remote_id)
    }
}

impl RecordSink for SharedDb {
    fn upsert_batch(&mut self, rows: &[MirroredRecord]) -> anyhow::Result<usize> {
        self.lock()?.upsert_records(rows)
    }
}

/// Run one synchronization for an installation and resource kind
///
/// Completed runs report their counts even when `errors > 0`; only fetch-stage
/// and configuration failures produce an error response.
async fn run_sync<F: PageFetcher>(
    State(state): State<AppState<F>>,
    Path((installation_id, resource)): Path<(String, String)>,
) -> Result<Json<SyncSummary>, ApiError> {
    let resource: ResourceKind = resource
        .parse()
        .map_err(|_| ApiError::Input(format!("unknown resource kind: {}", resource)))?;

    let mut store = SharedDb(state.db.clone());
    let summary = state
        .orchestrator
        .run(&mut store, &installation_id, resource)
        .await?;

    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct RecordsQuery {
    kind: Option<String>,
    status: Option<String>,
    limit: Option<usize>,
}

/// Dashboard listing over mirrored rows
async fn list_records<F: PageFetcher>(
    State(state): State<AppState<F>>,
    Path(installation_id): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<ResourceKind>)
        .transpose()
        .map_err(|e| ApiError::Input(e.to_string()))?;

    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))?;
    if db
        .get_installation(&installation_id)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::NotFound(format!(
            "installation not found: {}",
            installation_id
        )));
    }

    let records = db
        .list_records(
            &installation_id,
            kind,
            query.status.as_deref(),
            query.limit.unwrap_or(100).min(500),
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "count": records.len(),
        "records": records,
    })))
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API error with HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    Input(String),
    NotFound(String),
    Upstream(String),
    Timeout(String),
    Internal(String),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InstallationNotFound(_) => Self::NotFound(err.to_string()),
            SyncError::MissingShopDomain { .. }
            | SyncError::NoUsableCredential { .. }
            | SyncError::InactiveInstallation(_)
            | SyncError::ValidationError(_) => Self::Input(err.to_string()),
            SyncError::AllEndpointsExhausted { .. }
            | SyncError::InvalidResponse(_)
            | SyncError::HttpError(_) => Self::Upstream(err.to_string()),
            SyncError::RunTimeout { .. } => Self::Timeout(err.to_string()),
            SyncError::StorageError(_) => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Input(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, "input_error"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found"),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg, "upstream_error"),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg, "timeout"),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, "internal_error"),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
