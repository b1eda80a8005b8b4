// handlers/calls/record.rs - /api/v1/calls/:call_id

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::database::models::{CallRecord, NewCall};
use crate::handlers::AppContext;
use crate::middleware::{call_id_path, json_body, ApiResponse, ApiResult};

/// GET /api/v1/calls/:call_id
pub async fn get(
    Extension(ctx): Extension<AppContext>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<CallRecord> {
    let call_id = call_id_path(path)?;
    let call = ctx.service.get(call_id).await?;
    Ok(ApiResponse::success(call))
}

/// PUT /api/v1/calls/:call_id - full replacement of caller-owned fields
pub async fn put(
    Extension(ctx): Extension<AppContext>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewCall>, JsonRejection>,
) -> ApiResult<Value> {
    let call_id = call_id_path(path)?;
    let call = json_body(payload)?.validated()?;
    let updated = ctx.service.update(call_id, call).await?;
    Ok(ApiResponse::success(json!({
        "message": "Call updated successfully",
        "call": updated
    })))
}

/// DELETE /api/v1/calls/:call_id
pub async fn delete(
    Extension(ctx): Extension<AppContext>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let call_id = call_id_path(path)?;
    let deleted = ctx.service.delete(call_id).await?;
    Ok(ApiResponse::success(json!({
        "message": "Call deleted successfully",
        "call": deleted
    })))
}
