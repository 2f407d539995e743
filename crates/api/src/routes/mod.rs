//! Request handlers, one module per resource

pub mod alerts;
pub mod control;
pub mod frame;
pub mod metrics;
pub mod music;
pub mod results;
pub mod status;
pub mod video;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;

/// Unwrap a JSON body.
///
/// A body over the route's size limit is a 413; every other rejection is
/// the client-facing 400.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_)
        | JsonRejection::JsonSyntaxError(_)
        | JsonRejection::JsonDataError(_) => ApiError::BadRequest("Expected JSON request".into()),
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            ApiError::PayloadTooLarge(other.body_text())
        }
        _ => ApiError::BadRequest("Expected JSON request".into()),
    })
}
