//! Frame ingress

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use camera_capture::VideoFrame;
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::json_body;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// `POST /api/frame` and `POST /detect`: `{frame: <base64 image>}`, with or
/// without a `data:...,` prefix. The decoded frame replaces whatever is in
/// the mailbox; a rejected payload leaves it untouched.
pub async fn post_frame(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FrameResponse>, ApiError> {
    let body = json_body(payload)?;

    let data = match body.get("frame") {
        None | Some(Value::Null) => {
            return Err(ApiError::BadRequest("No frame data provided".into()));
        }
        Some(Value::String(data)) => data.clone(),
        Some(_) => {
            return Err(ApiError::BadRequest(
                "Failed to decode image: frame must be a base64 string".into(),
            ));
        }
    };

    let frame = tokio::task::spawn_blocking(move || VideoFrame::decode_base64(&data)).await??;
    debug!("Frame received: {}x{}", frame.width, frame.height);

    counter!("frames_ingested_total").increment(1);
    if state.mailbox.put(frame) {
        counter!("frames_overwritten_total").increment(1);
    }

    Ok(Json(FrameResponse {
        status: "success",
        message: "Frame received",
    }))
}
