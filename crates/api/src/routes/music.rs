//! Music player control

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::json_body;
use crate::error::ApiError;
use crate::music::MusicInfo;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MusicResponse {
    pub status: &'static str,
    pub message: String,
}

pub async fn current(State(state): State<Arc<AppState>>) -> Json<MusicInfo> {
    Json(state.music.current())
}

/// `POST /api/music/play` with `{mood}`
pub async fn play(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MusicResponse>, ApiError> {
    let body = json_body(payload)?;
    let mood = body
        .get("mood")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No mood specified".into()))?;

    state.music.play_for_mood(mood);
    Ok(Json(MusicResponse {
        status: "success",
        message: format!("Playing music for mood: {}", mood),
    }))
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Json<MusicResponse> {
    state.music.stop();
    Json(MusicResponse {
        status: "success",
        message: "Music stopped".to_string(),
    })
}
