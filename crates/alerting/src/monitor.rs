//! Turns snapshot transitions into logged alerts

use fusion::{AggregateSnapshot, AlertStatus, SnapshotObserver};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

use crate::log::{AlertLog, AlertRecord};
use crate::manager::{AlertConfig, AlertManager};
use crate::AlertKind;

struct MonitorState {
    manager: AlertManager,
    last_status: AlertStatus,
    phone_detected: bool,
}

/// Logs a drowsiness alert when the status rises to `high` and a phone
/// alert when a phone appears, subject to cooldown and throttling
pub struct AlertMonitor {
    state: Mutex<MonitorState>,
    log: Arc<AlertLog>,
}

impl AlertMonitor {
    pub fn new(config: AlertConfig, log: Arc<AlertLog>) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                manager: AlertManager::new(config),
                last_status: AlertStatus::Normal,
                phone_detected: false,
            }),
            log,
        }
    }

    pub fn log(&self) -> &Arc<AlertLog> {
        &self.log
    }

    /// Manually raised SOS; bypasses deduplication
    pub fn trigger_sos(&self, reason: &str) -> AlertRecord {
        warn!("SOS alert triggered: {}", reason);
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .manager
            .record_fire(AlertKind::Sos);
        self.log
            .log(AlertKind::Sos, format!("SOS Alert triggered: {}", reason))
    }
}

impl SnapshotObserver for AlertMonitor {
    fn observe(&self, snapshot: &AggregateSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let status = snapshot.drowsiness.alert_status();
        if status == AlertStatus::High && state.last_status != AlertStatus::High {
            let level = snapshot.drowsiness.drowsiness_level();
            if state.manager.should_fire(AlertKind::Drowsiness, f64::from(level) / 100.0) {
                state.manager.record_fire(AlertKind::Drowsiness);
                warn!("Drowsiness alert: level {}", level);
                self.log.log(
                    AlertKind::Drowsiness,
                    format!("Driver drowsiness level {} reached high alert", level),
                );
            }
        }
        state.last_status = status;

        let phone = &snapshot.phone;
        if phone.is_detected && !state.phone_detected
            && state.manager.should_fire(AlertKind::Phone, f64::from(phone.confidence))
        {
            state.manager.record_fire(AlertKind::Phone);
            self.log.log(
                AlertKind::Phone,
                format!("Phone usage detected (confidence {:.2})", phone.confidence),
            );
        }
        state.phone_detected = phone.is_detected;
    }
}
