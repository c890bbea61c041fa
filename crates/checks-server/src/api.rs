//! JSON API over the check store, plus the Prometheus metrics endpoint.

use crate::metrics::MetricsRegistry;
use crate::types::{ErrorResponse, MutationResponse};
use crate::validation::{validate_check, validate_id};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use checks::{CheckId, CheckMap, CheckStore};
use common::Error;
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// Attempts at finding an unused id before giving up.
const ID_ATTEMPTS: usize = 8;

/// Shared state of the API handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<CheckStore>,
    pub metrics: Option<Arc<MetricsRegistry>>,
    pub resolve_hosts: bool,
}

/// HTTP server for the check API
pub struct ApiServer {
    state: ApiState,
    listen_addr: String,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: ApiState, listen_addr: String) -> Self {
        Self { state, listen_addr }
    }

    /// Run the HTTP server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = router(self.state);

        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "API server listening");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the API router
pub fn router(state: ApiState) -> Router {
    finish(routes(), state)
}

fn routes() -> Router<ApiState> {
    Router::new()
        .route("/ping", get(ping))
        .route(
            "/api/check",
            get(get_check)
                .post(create_check)
                .put(update_check)
                .delete(delete_check),
        )
        .route("/api/check/all", get(list_checks))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
}

fn finish(routes: Router<ApiState>, state: ApiState) -> Router {
    routes
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

/// Store error rendered as a JSON response
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Capacity(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
            "An unknown error has occurred".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "An unknown error has occurred".to_string(),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct IdQuery {
    id: Option<String>,
}

async fn ping() -> StatusCode {
    StatusCode::OK
}

async fn list_checks(State(state): State<ApiState>) -> Json<CheckMap> {
    Json(state.store.list())
}

async fn get_check(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, ApiError> {
    let raw = query.id.unwrap_or_default();
    // A malformed id cannot name an existing check.
    let check = CheckId::parse(&raw)
        .ok()
        .and_then(|id| state.store.get(&id))
        .ok_or_else(|| Error::not_found(&raw))?;
    Ok(Json(check).into_response())
}

async fn create_check(
    State(state): State<ApiState>,
    body: String,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let check = validate_check(&body, state.resolve_hosts).await?;

    for _ in 0..ID_ATTEMPTS {
        let id = CheckId::generate();
        match state.store.insert(id.clone(), check.clone()) {
            Ok(()) => {
                info!(id = %id, url = %check.url, method = %check.method, "Check added");
                return Ok((
                    StatusCode::CREATED,
                    Json(MutationResponse {
                        message: format!("Check with id '{}' successfully added", id),
                        id: id.to_string(),
                    }),
                ));
            }
            Err(Error::DuplicateId(taken)) => {
                warn!(id = %taken, "Generated id already taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::other("Unable to allocate a check id").into())
}

async fn update_check(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
    body: String,
) -> Result<Json<MutationResponse>, ApiError> {
    let id = validate_id(query.id.as_deref())?;
    let check = validate_check(&body, state.resolve_hosts).await?;

    state.store.update(&id, check)?;
    info!(id = %id, "Check updated");

    Ok(Json(MutationResponse {
        message: format!("Check with id '{}' successfully updated", id),
        id: id.to_string(),
    }))
}

async fn delete_check(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<MutationResponse>, ApiError> {
    let id = validate_id(query.id.as_deref())?;

    state.store.delete(&id)?;
    info!(id = %id, "Check deleted");

    Ok(Json(MutationResponse {
        message: format!("Check with id '{}' successfully deleted", id),
        id: id.to_string(),
    }))
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(state): State<ApiState>) -> Response {
    let Some(registry) = state.metrics else {
        return not_found().await.into_response();
    };

    match registry.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "The requested path is not available".to_string(),
        }),
    )
}
