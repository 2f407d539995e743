//! Alerting System
//!
//! Deduplicates and throttles driver alerts and keeps a bounded in-memory
//! alert history:
//! - `AlertManager`: confidence threshold, per-kind cooldown, hourly cap
//! - `AlertLog`: alert history served to clients, newest first
//! - `AlertMonitor`: watches the fused snapshot and raises alerts

mod log;
mod manager;
mod monitor;

pub use log::{AlertLog, AlertRecord};
pub use manager::{AlertConfig, AlertManager, AlertState};
pub use monitor::AlertMonitor;

use serde::Serialize;

/// Alert categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Drowsiness,
    Phone,
    Sos,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Drowsiness => "drowsiness",
            AlertKind::Phone => "phone",
            AlertKind::Sos => "sos",
        }
    }
}
