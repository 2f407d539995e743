//! In-memory alert history

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::AlertKind;

/// One logged alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub alert_type: AlertKind,
    pub message: String,
}

struct Entries {
    records: VecDeque<AlertRecord>,
    next_id: u64,
}

/// Bounded alert log; oldest records are dropped first
pub struct AlertLog {
    entries: Mutex<Entries>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        info!("Creating in-memory alert log ({} records)", capacity);
        Self {
            entries: Mutex::new(Entries {
                records: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an alert and return the stored record
    pub fn log(&self, alert_type: AlertKind, message: impl Into<String>) -> AlertRecord {
        let mut entries = self.lock();

        let record = AlertRecord {
            id: entries.next_id,
            timestamp: Utc::now(),
            alert_type,
            message: message.into(),
        };
        entries.next_id += 1;

        while entries.records.len() >= self.capacity {
            entries.records.pop_front();
        }
        entries.records.push_back(record.clone());
        debug!("Logged {} alert with ID {}", alert_type.as_str(), record.id);

        record
    }

    /// Up to `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<AlertRecord> {
        self.lock().records.iter().rev().take(limit).cloned().collect()
    }

    /// Every kept record, newest first
    pub fn all(&self) -> Vec<AlertRecord> {
        self.recent(self.capacity)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().records.clear();
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(100)
    }
}
