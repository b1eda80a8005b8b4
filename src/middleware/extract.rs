use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::Json;

use crate::database::models::FieldErrors;
use crate::error::ApiError;

/// Unwrap a JSON body, turning axum's rejection into the API error envelope.
///
/// Syntax errors are 400; JSON that parses but does not fit the payload
/// type (missing field, wrong type) is 422.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(json_rejection(rejection)),
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!(error = %rejection, "Rejected request body");
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let mut field_errors = FieldErrors::new();
            field_errors.insert("body".to_string(), err.body_text());
            ApiError::validation(field_errors)
        }
        JsonRejection::JsonSyntaxError(err) => ApiError::invalid_json(err.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::invalid_json("Expected request with `Content-Type: application/json`")
        }
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            ApiError::payload_too_large("Request body exceeds the configured size limit")
        }
        other => ApiError::bad_request(other.body_text()),
    }
}

/// Unwrap a numeric `:call_id` path segment
pub fn call_id_path(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("Invalid call ID"))
}

/// Unwrap query parameters that failed to deserialize (e.g. `?page=abc`)
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
