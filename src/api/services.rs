use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use std::collections::BTreeMap;
use tracing::debug;

use super::{
    error::ApiError,
    models::{CreateTaskRequest, HealthResponse},
    state::AppState,
    utils::{parse_content_type, read_limited},
    validation::validate_request,
};
use crate::tasks::TaskId;

/// Task submission endpoint (POST /tasks)
///
/// ## Flow:
/// 1. Require `Content-Type: application/json`
/// 2. Read the body (gzip already undone by the decompression layer) up to
///    `server.api.max_payload_bytes`
/// 3. Deserialize and enforce `max_urls_per_task`
/// 4. Hand the URLs to the task manager, which validates them and either
///    queues the task or rejects it because the queue is full
/// 5. Return 201 Created with the new `pending` task
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    let limits = &state.config.server.api;
    let body = read_limited(body, limits.max_payload_bytes.as_usize()).await?;

    let request: CreateTaskRequest = serde_json::from_slice(&body)?;
    validate_request(&request, limits).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let task = state.manager.create_task(request.urls).await?;
    debug!(task_id = %task.id, "Task accepted over HTTP");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Task status endpoint (GET /tasks/{id})
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.manager.get_task(&TaskId::from(id)).await?;
    Ok((StatusCode::OK, Json(task)))
}

/// Every known task, oldest first (GET /tasks)
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.list_tasks().await)
}

/// Health check endpoint (GET /health)
///
/// 503 once the manager stopped accepting tasks. A saturated queue marks
/// the service `degraded` but still answers 200.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.manager.stats().await;

    let manager_status = if stats.accepting { "healthy" } else { "unhealthy" };
    let queue_status = if stats.queue_depth >= stats.queue_capacity {
        "degraded"
    } else {
        "healthy"
    };

    let components = BTreeMap::from([
        ("api", "healthy"),
        ("task_manager", manager_status),
        ("queue", queue_status),
    ]);

    let (status, code) = if components.values().any(|s| *s == "unhealthy") {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    } else if components.values().any(|s| *s == "degraded") {
        ("degraded", StatusCode::OK)
    } else {
        ("healthy", StatusCode::OK)
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now(),
        components,
        workers: stats.workers,
        queue_depth: stats.queue_depth,
        queue_capacity: stats.queue_capacity,
        tasks: stats.tasks,
        metrics: stats.metrics,
    };

    (code, Json(response))
}
