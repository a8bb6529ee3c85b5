// crates/mobile-core-api/src/handlers.rs
// ============================================================================
// Module: App Handlers
// Description: axum routes for app administration and SDK configuration.
// Purpose: Translate HTTP requests into lifecycle operations and back.
// Dependencies: axum, mobile-core, serde, tokio
// ============================================================================

//! ## Overview
//! Handlers are thin: each one decodes its input, runs the blocking lifecycle
//! call on tokio's blocking pool, records an audit event for mutations, and
//! maps the result through [`ApiError`].
//!
//! Status mapping: not found is 404, conflicts are 409, validation failures
//! are 400, a bad SDK API key is 401, and everything else (including partial
//! failures, which carry the affected app id) is 500.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use mobile_core::App;
use mobile_core::AppLifecycleService;
use mobile_core::ClientType;
use mobile_core::LifecycleError;
use mobile_core::ReconcileReport;
use mobile_core::RepositoryError;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::audit::AuditSink;
use crate::audit::LifecycleAction;
use crate::audit::LifecycleAuditEvent;
use crate::gate::AccessGate;
use crate::gate::enforce;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying an app's API key on SDK requests.
pub const API_KEY_HEADER: &str = "x-mcp-api-key";

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// App lifecycle service.
    lifecycle: Arc<AppLifecycleService>,
    /// Audit sink for lifecycle events.
    audit: Arc<dyn AuditSink>,
}

impl AppState {
    /// Creates handler state.
    #[must_use]
    pub fn new(lifecycle: AppLifecycleService, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            audit,
        }
    }

    /// Returns the lifecycle service.
    #[must_use]
    pub fn lifecycle(&self) -> &AppLifecycleService {
        &self.lifecycle
    }
}

/// Builds the API router with the gate applied to every route.
pub fn router(state: AppState, gate: AccessGate, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/sys/info/ping", get(ping))
        .route("/sys/info/health", get(health))
        .route("/apps", get(list_apps).post(create_app))
        .route("/apps/reconcile", post(reconcile))
        .route("/apps/{app}", get(read_app).put(update_app).delete(delete_app))
        .route("/sdk/mobileapp/{id}/config", get(sdk_config))
        .fallback(not_found)
        .layer(from_fn_with_state(gate, enforce))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP-facing error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// SDK request carried no API key.
    #[error("missing api key")]
    MissingApiKey,
    /// Internal failure outside the lifecycle service.
    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self::Lifecycle(LifecycleError::Repository(err))
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Error text.
    error: String,
    /// App affected by a partial failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    app_id: Option<String>,
}

impl ApiError {
    /// Returns the HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Lifecycle(LifecycleError::Repository(RepositoryError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            Self::Lifecycle(LifecycleError::Repository(RepositoryError::Conflict(_))) => {
                StatusCode::CONFLICT
            }
            Self::Lifecycle(LifecycleError::Repository(RepositoryError::Validation(_))) => {
                StatusCode::BAD_REQUEST
            }
            Self::Lifecycle(LifecycleError::InvalidApiKey(_)) | Self::MissingApiKey => {
                StatusCode::UNAUTHORIZED
            }
            Self::Lifecycle(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Lifecycle(LifecycleError::PartialFailure {
                app_id,
                step,
                source,
            }) => ErrorBody {
                error: format!("{step} failed: {source}"),
                app_id: Some(app_id),
            },
            other => ErrorBody {
                error: other.to_string(),
                app_id: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// `POST /apps` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppRequest {
    /// App name.
    name: String,
    /// Client platform.
    #[serde(default)]
    client_type: ClientType,
    /// Display name.
    #[serde(default)]
    display_name: String,
    /// Description.
    #[serde(default)]
    description: String,
    /// User labels.
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

/// `PUT /apps/{name}` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAppRequest {
    /// New app name; unchanged when absent.
    #[serde(default)]
    name: Option<String>,
    /// New client platform; unchanged when absent.
    #[serde(default)]
    client_type: Option<ClientType>,
}

/// SDK configuration response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SdkConfigResponse {
    /// App id.
    id: String,
    /// App name.
    name: String,
    /// Client platform.
    client_type: ClientType,
}

/// Health response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    /// `ok` or `unavailable`.
    status: &'static str,
    /// Readiness failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Unknown route.
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Liveness probe.
async fn ping() -> &'static str {
    "OK"
}

/// Readiness probe backed by the app store.
async fn health(State(state): State<AppState>) -> Response {
    let result = run_blocking(move || {
        state
            .lifecycle
            .repository()
            .store()
            .readiness()
            .map_err(|err| ApiError::Internal(err.to_string()))
    })
    .await;
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                error: None,
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                error: Some(err.to_string()),
            }),
        )
            .into_response(),
    }
}

/// Lists all apps.
async fn list_apps(State(state): State<AppState>) -> Result<Json<Vec<App>>, ApiError> {
    let apps =
        run_blocking(move || state.lifecycle.repository().list().map_err(ApiError::from)).await?;
    Ok(Json(apps))
}

/// Reads an app by name.
async fn read_app(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<App>, ApiError> {
    let app = run_blocking(move || {
        state.lifecycle.repository().read_by_name(&name).map_err(ApiError::from)
    })
    .await?;
    Ok(Json(app))
}

/// Creates an app and registers its API key.
async fn create_app(
    State(state): State<AppState>,
    Json(request): Json<CreateAppRequest>,
) -> Result<(StatusCode, Json<App>), ApiError> {
    let audit = Arc::clone(&state.audit);
    let result = run_blocking(move || {
        let mut app = App::new(request.name, request.client_type)
            .with_display_name(request.display_name)
            .with_description(request.description);
        app.labels = request.labels;
        state.lifecycle.create(app).map_err(ApiError::from)
    })
    .await;
    match &result {
        Ok(app) => audit.record_lifecycle(&LifecycleAuditEvent::ok(
            LifecycleAction::Create,
            Some(app.id.clone()),
        )),
        Err(err) => audit.record_lifecycle(&LifecycleAuditEvent::failed(
            LifecycleAction::Create,
            partial_app_id(err),
            err.to_string(),
        )),
    }
    Ok((StatusCode::CREATED, Json(result?)))
}

/// Updates an app's name or client type.
async fn update_app(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateAppRequest>,
) -> Result<Json<App>, ApiError> {
    let audit = Arc::clone(&state.audit);
    let result = run_blocking(move || {
        let repository = state.lifecycle.repository();
        let mut app = repository.read_by_name(&name)?;
        if let Some(new_name) = request.name {
            app.name = new_name;
        }
        if let Some(client_type) = request.client_type {
            app.client_type = client_type;
        }
        repository.update(&app).map_err(ApiError::from)
    })
    .await;
    match &result {
        Ok(app) => audit.record_lifecycle(&LifecycleAuditEvent::ok(
            LifecycleAction::Update,
            Some(app.id.clone()),
        )),
        Err(err) => audit.record_lifecycle(&LifecycleAuditEvent::failed(
            LifecycleAction::Update,
            None,
            err.to_string(),
        )),
    }
    Ok(Json(result?))
}

/// Deletes an app by id and unregisters its API key.
async fn delete_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let audit = Arc::clone(&state.audit);
    let app_id = id.clone();
    let result = run_blocking(move || state.lifecycle.delete(&id).map_err(ApiError::from)).await;
    match &result {
        Ok(()) => {
            audit.record_lifecycle(&LifecycleAuditEvent::ok(LifecycleAction::Delete, Some(app_id)));
        }
        Err(err) => audit.record_lifecycle(&LifecycleAuditEvent::failed(
            LifecycleAction::Delete,
            Some(app_id),
            err.to_string(),
        )),
    }
    result?;
    Ok(StatusCode::NO_CONTENT)
}

/// Repairs registry drift.
async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileReport>, ApiError> {
    let audit = Arc::clone(&state.audit);
    let result = run_blocking(move || state.lifecycle.reconcile().map_err(ApiError::from)).await;
    match &result {
        Ok(_) => audit.record_lifecycle(&LifecycleAuditEvent::ok(LifecycleAction::Reconcile, None)),
        Err(err) => audit.record_lifecycle(&LifecycleAuditEvent::failed(
            LifecycleAction::Reconcile,
            None,
            err.to_string(),
        )),
    }
    Ok(Json(result?))
}

/// Returns SDK configuration for an app after verifying its API key.
async fn sdk_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SdkConfigResponse>, ApiError> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingApiKey)?
        .to_string();
    let app = run_blocking(move || {
        state.lifecycle.verify_api_key(&id, &api_key).map_err(ApiError::from)
    })
    .await?;
    Ok(Json(SdkConfigResponse {
        id: app.id,
        name: app.name,
        client_type: app.client_type,
    }))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs a blocking closure on tokio's blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
}

/// Returns the app id carried by a partial failure.
fn partial_app_id(err: &ApiError) -> Option<String> {
    match err {
        ApiError::Lifecycle(LifecycleError::PartialFailure {
            app_id, ..
        }) => Some(app_id.clone()),
        _ => None,
    }
}
