// handlers/calls/collection.rs - /api/v1/calls and /api/v1/calls/batch

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::database::models::{CallBatch, NewCall};
use crate::handlers::AppContext;
use crate::middleware::{json_body, query_params, ApiResponse, ApiResult};
use crate::services::{CallPage, Pagination, PaginationQuery};

/// GET /api/v1/calls?page=&limit= - newest calls first
pub async fn list(
    Extension(ctx): Extension<AppContext>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> ApiResult<CallPage> {
    let query = query_params(query)?;
    let pagination = Pagination::from_query(&query, &ctx.config.api)?;
    let page = ctx.service.list(pagination).await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/v1/calls - create one call
pub async fn create(
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<NewCall>, JsonRejection>,
) -> ApiResult<Value> {
    let call = json_body(payload)?.validated()?;
    let created = ctx.service.create(call).await?;
    Ok(ApiResponse::created(json!({
        "message": "Call created successfully",
        "call": created
    })))
}

/// POST /api/v1/calls/batch - create every call or none
pub async fn create_batch(
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<CallBatch>, JsonRejection>,
) -> ApiResult<Value> {
    let batch = json_body(payload)?;

    // Size limits are reported before per-record field errors
    ctx.service.writer().check_batch_size(batch.calls.len())?;
    let calls = batch.validated()?;

    let created = ctx.service.write_batch(&calls).await?;
    Ok(ApiResponse::created(json!({
        "message": format!("{} calls created successfully", created.len()),
        "calls": created
    })))
}
