//! Aggregation store: the single writer path into the snapshot

use chrono::Utc;
use dms::{DetectorResult, DrowsinessReading, EmotionReading, HeartRateReading, PhoneReading};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::snapshot::{
    AggregateSnapshot, DrowsinessData, DrowsinessStatus, EmotionRecord, EmotionStatus,
    HeartRateRecord, HeartRateView, PhoneStatus, MAX_DROWSINESS_LEVEL,
};

/// Level gained on a drowsy tick
pub const LEVEL_RISE: u8 = 5;

/// Level lost on an alert tick
pub const LEVEL_DECAY: u8 = 2;

/// Receives the snapshot after every processed frame
pub trait SnapshotObserver: Send + Sync {
    fn observe(&self, snapshot: &AggregateSnapshot);
}

/// Owns the fused snapshot; every mutation runs under one lock
#[derive(Debug, Default)]
pub struct AggregationStore {
    state: Mutex<AggregateSnapshot>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AggregateSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fold a drowsiness reading in.
    ///
    /// The level rises by 5 on a drowsy tick and decays by 2 otherwise.
    pub fn apply_drowsiness(&self, reading: &DrowsinessReading) {
        let mut state = self.lock();
        let d = &mut state.drowsiness;

        d.ear_value = reading.ear.unwrap_or(0.0);
        d.is_drowsy = reading.is_drowsy.unwrap_or(false);
        d.face_detected = reading.face_detected.unwrap_or(true);
        if let Some(update) = reading.blinks {
            d.blink_count = update.apply(d.blink_count);
        }
        if let Some(update) = reading.yawns {
            d.yawn_count = update.apply(d.yawn_count);
        }
        if let Some(pose) = reading.head_pose {
            d.head_pose = pose;
        }

        let level = if d.is_drowsy {
            d.drowsiness_level()
                .saturating_add(LEVEL_RISE)
                .min(MAX_DROWSINESS_LEVEL)
        } else {
            d.drowsiness_level().saturating_sub(LEVEL_DECAY)
        };
        let before = d.alert_status();
        d.set_level(level);
        if d.alert_status() != before {
            debug!(
                "Alert status {} -> {} (level {})",
                before.as_str(),
                d.alert_status().as_str(),
                level
            );
        }
    }

    pub fn apply_emotion(&self, reading: &EmotionReading) {
        let mut state = self.lock();
        let e = &mut state.emotion;
        e.current_emotion = reading.label;
        e.confidence = reading.confidence;
        e.emotion_history.push(EmotionRecord {
            emotion: reading.label,
            confidence: reading.confidence,
            timestamp: Utc::now(),
        });
    }

    pub fn apply_phone(&self, reading: &PhoneReading) {
        let mut state = self.lock();
        let p = &mut state.phone;
        p.is_detected = reading.is_detected;
        p.confidence = reading.confidence;
        if reading.is_detected {
            let now = Utc::now();
            // Never step backwards if the wall clock does
            p.last_detected = Some(p.last_detected.map_or(now, |prev| prev.max(now)));
        }
    }

    pub fn apply_heart_rate(&self, reading: &HeartRateReading) {
        let mut state = self.lock();
        let h = &mut state.heart_rate;
        h.bpm = reading.bpm;
        h.status = reading.status;
        h.history.push(HeartRateRecord {
            bpm: reading.bpm,
            status: reading.status,
            timestamp: Utc::now(),
        });
    }

    /// Dispatch a detector result to its update policy
    pub fn apply(&self, result: &DetectorResult) {
        match result {
            DetectorResult::Drowsiness(r) => self.apply_drowsiness(r),
            DetectorResult::Emotion(r) => self.apply_emotion(r),
            DetectorResult::Phone(r) => self.apply_phone(r),
            DetectorResult::HeartRate(r) => self.apply_heart_rate(r),
        }
    }

    /// Independent copy of the whole snapshot
    pub fn snapshot(&self) -> AggregateSnapshot {
        self.lock().clone()
    }

    pub fn drowsiness(&self) -> DrowsinessStatus {
        self.lock().drowsiness.clone()
    }

    pub fn emotion(&self) -> EmotionStatus {
        self.lock().emotion.clone()
    }

    pub fn phone(&self) -> PhoneStatus {
        self.lock().phone.clone()
    }

    pub fn heart_rate(&self) -> HeartRateView {
        self.lock().heart_rate.clone()
    }

    pub fn drowsiness_data(&self) -> DrowsinessData {
        DrowsinessData::from(&self.lock().drowsiness)
    }
}
