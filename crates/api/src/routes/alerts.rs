//! Alert history and manual SOS

use alerting::AlertRecord;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::json_body;
use crate::error::ApiError;
use crate::AppState;

/// Query parameters for alert history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of alerts to return
    pub limit: Option<usize>,
}

/// `GET /api/alert-history`: newest first
pub async fn alert_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<AlertRecord>> {
    let log = state.alerts.log();
    Json(match query.limit {
        Some(limit) => log.recent(limit),
        None => log.all(),
    })
}

#[derive(Debug, Serialize)]
pub struct SosResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub alert: AlertRecord,
}

/// `POST /api/trigger-sos` with optional `{reason}`
pub async fn trigger_sos(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SosResponse>, ApiError> {
    let body = json_body(payload)?;
    let reason = body
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("Manual trigger");

    let alert = state.alerts.trigger_sos(reason);
    Ok(Json(SosResponse {
        status: "success",
        message: "SOS Alert triggered",
        alert,
    }))
}
