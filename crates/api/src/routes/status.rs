//! Liveness and component status

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use dms::DetectorKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::AppState;

/// `GET /api/status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub is_processing: bool,
    pub components: BTreeMap<&'static str, &'static str>,
    pub camera_open: bool,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

fn activity(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let registered = state.scheduler.detector_kinds();
    let mut components: BTreeMap<&'static str, &'static str> = DetectorKind::ALL
        .iter()
        .map(|kind| (kind.component_name(), activity(registered.contains(kind))))
        .collect();
    components.insert("music_player", "active");
    components.insert("sos_alert", "active");

    Json(StatusResponse {
        status: "online",
        timestamp: Utc::now().to_rfc3339(),
        is_processing: state.is_processing(),
        components,
        camera_open: state.camera.is_open(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /detect/status`
#[derive(Debug, Serialize)]
pub struct DetectStatusResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn detect_status() -> Json<DetectStatusResponse> {
    Json(DetectStatusResponse {
        status: "online",
        timestamp: Utc::now().to_rfc3339(),
    })
}
