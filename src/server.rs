use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::dispatch;
use crate::error::{DispatchError, ErrorResponse, RouteNotFound};
use crate::exposition;
use crate::openapi;

/// Build the HTTP surface for a frozen registry.
pub fn router(state: AppState) -> Router {
    let limits = state.config.limits.clone();

    let app = Router::new()
        .route("/", get(|| async { Redirect::temporary("/docs") }))
        .route("/health", get(health))
        .route("/tool/{*name}", post(call_tool))
        .route("/schema", get(schema_all))
        .route("/schema/{*name}", get(schema_for))
        .route("/openapi.json", get(openapi_document))
        .route("/openapi/{*name}", get(tool_openapi_document))
        .route("/docs", get(docs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(limits.body_limit_bytes));

    // A zero timeout turns the middleware off; a year-long one keeps the
    // router type the same.
    let timeout_duration = match limits.request_timeout_secs {
        0 => Duration::from_secs(365 * 24 * 60 * 60),
        secs => Duration::from_secs(secs),
    };

    app.layer(axum::middleware::from_fn(
        move |req: Request, next: Next| async move {
            match tokio::time::timeout(timeout_duration, next.run(req)).await {
                Ok(res) => res,
                Err(_) => (
                    StatusCode::REQUEST_TIMEOUT,
                    Json(ErrorResponse::new("timeout", "Request timed out")),
                )
                    .into_response(),
            }
        },
    ))
    .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_address();
    let tools = state.registry.len();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        tools,
        docs = %format!("{}/docs", state.config.public_url()),
        "Server started"
    );

    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Error responses
// ─────────────────────────────────────────────────────────────────────────────

fn status_for(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::RouteNotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DispatchError::Handler { .. } | DispatchError::Encoding { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (status_for(&self), Json(ErrorResponse::from(&self))).into_response()
    }
}

impl IntoResponse for RouteNotFound {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, Json(ErrorResponse::from(&self))).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /tool/{name} - Validate, invoke and encode one call.
async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, DispatchError> {
    dispatch::handle_raw(&state.registry, &name, &body)
        .await
        .map(Json)
}

/// GET /schema/{name} - Schema document for one tool.
async fn schema_for(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<exposition::SchemaDocument>, RouteNotFound> {
    exposition::schema_for(&state.registry, &name).map(Json)
}

/// GET /schema - Schema documents for every tool, in registration order.
async fn schema_all(State(state): State<AppState>) -> Json<Value> {
    Json(json!(exposition::schema_all(&state.registry)))
}

/// GET /openapi.json - Aggregate OpenAPI document.
async fn openapi_document(State(state): State<AppState>) -> Json<Value> {
    let url = state.config.public_url();
    Json(openapi::document(&state.info, &state.registry, Some(&url)))
}

/// GET /openapi/{name} - Stand-alone OpenAPI document for one tool.
async fn tool_openapi_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, RouteNotFound> {
    let entry = state.registry.lookup(&name)?;
    Ok(Json(openapi::tool_document(
        &state.info,
        &entry,
        &state.config.public_url(),
    )))
}

/// GET /docs - Swagger UI.
async fn docs(State(state): State<AppState>) -> Html<String> {
    Html(openapi::swagger_ui(&state.info.title, "/openapi.json"))
}

/// GET /health - Liveness probe.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"status": "ok", "tools": state.registry.len()}))
}
