use axum::{extract::State, http::header, response::IntoResponse, Json};
use utoipa::OpenApi;

use super::{
    dto::{ErrorDto, HealthDto},
    errors::AppError,
};
use crate::metrics::MetricsRegistry;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Prometheus text exposition of every analyzer series.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus text format", body = String, content_type = "text/plain"),
        (status = 500, description = "Encoding failed", body = ErrorDto),
    ),
    tag = "system"
)]
pub async fn metrics(State(metrics): State<MetricsRegistry>) -> Result<impl IntoResponse, AppError> {
    let body = metrics.render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Liveness only. The queue and the archive are not checked.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthDto),
    ),
    tag = "system"
)]
pub async fn health() -> Json<HealthDto> {
    Json(HealthDto::healthy())
}

// ---------------------------------------------------------------------------
// OpenAPI document
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(metrics, health),
    components(schemas(HealthDto, ErrorDto)),
    tags(
        (name = "system", description = "Operational endpoints"),
    ),
    info(
        title = "Agro Analysis Worker",
        version = "0.1.0",
        description = "Operational HTTP surface of the agro telemetry analysis worker"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
