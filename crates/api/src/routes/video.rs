//! MJPEG feed

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use stream_renderer::STREAM_CONTENT_TYPE;
use tracing::info;

use crate::AppState;

/// `GET /video_feed`: endless multipart stream, one JPEG per renderer tick
pub async fn video_feed(State(state): State<Arc<AppState>>) -> Response {
    info!("Video feed client connected");
    let stream = Arc::clone(&state.renderer).stream();

    (
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
