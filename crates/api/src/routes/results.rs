//! Aggregated driver status views

use axum::extract::State;
use axum::Json;
use fusion::{AggregateSnapshot, DrowsinessData, DrowsinessStatus, EmotionStatus, HeartRateView, PhoneStatus};
use std::sync::Arc;

use crate::AppState;

pub async fn get_results(State(state): State<Arc<AppState>>) -> Json<AggregateSnapshot> {
    Json(state.store.snapshot())
}

pub async fn get_drowsiness(State(state): State<Arc<AppState>>) -> Json<DrowsinessStatus> {
    Json(state.store.drowsiness())
}

pub async fn get_emotion(State(state): State<Arc<AppState>>) -> Json<EmotionStatus> {
    Json(state.store.emotion())
}

pub async fn get_phone(State(state): State<Arc<AppState>>) -> Json<PhoneStatus> {
    Json(state.store.phone())
}

pub async fn get_heart_rate(State(state): State<Arc<AppState>>) -> Json<HeartRateView> {
    Json(state.store.heart_rate())
}

/// Flattened drowsiness fields for the dashboard gauges
pub async fn get_drowsiness_data(State(state): State<Arc<AppState>>) -> Json<DrowsinessData> {
    Json(state.store.drowsiness_data())
}
