// handlers/public/mod.rs - GET / and GET /health

use axum::{http::StatusCode, Extension};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::AppContext;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - service information
pub async fn root(Extension(ctx): Extension<AppContext>) -> ApiResult<Value> {
    let api = &ctx.config.api;
    Ok(ApiResponse::success(json!({
        "name": api.title,
        "description": api.description,
        "version": api.version,
        "environment": ctx.config.environment,
        "endpoints": {
            "health": "/health",
            "calls": "/api/v1/calls",
            "batch": "/api/v1/calls/batch"
        }
    })))
}

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health(Extension(ctx): Extension<AppContext>) -> ApiResponse<Value> {
    match ctx.service.ping().await {
        Ok(()) => ApiResponse::success(json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            ApiResponse::with_status(
                json!({
                    "status": "degraded",
                    "database": "unavailable"
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
