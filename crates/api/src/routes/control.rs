//! Camera start/stop

use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::error;

use crate::state::ControlOutcome;
use crate::AppState;

async fn run_blocking<F>(state: Arc<AppState>, f: F) -> Json<ControlOutcome>
where
    F: FnOnce(&AppState) -> ControlOutcome + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(state.as_ref())).await {
        Ok(outcome) => Json(outcome),
        Err(e) => {
            error!("Camera control task failed: {}", e);
            Json(ControlOutcome {
                success: false,
                message: format!("Error: {}", e),
            })
        }
    }
}

/// `GET /api/start-drowsiness-detection`
pub async fn start_detection(State(state): State<Arc<AppState>>) -> Json<ControlOutcome> {
    run_blocking(state, AppState::start_detection).await
}

/// `GET /api/stop-drowsiness-detection`
pub async fn stop_detection(State(state): State<Arc<AppState>>) -> Json<ControlOutcome> {
    run_blocking(state, AppState::stop_detection).await
}
