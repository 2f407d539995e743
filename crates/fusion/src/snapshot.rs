//! The fused driver status exposed to clients

use chrono::{DateTime, Utc};
use dms::{Emotion, HeadPose, HeartRateStatus};
use serde::Serialize;

use crate::history::History;

/// Upper bound of the drowsiness accumulator
pub const MAX_DROWSINESS_LEVEL: u8 = 100;

/// Alert status derived from the drowsiness level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Normal,
    Medium,
    High,
}

impl AlertStatus {
    /// `normal` up to 40, `medium` 41-70, `high` above 70
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=40 => AlertStatus::Normal,
            41..=70 => AlertStatus::Medium,
            _ => AlertStatus::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Normal => "normal",
            AlertStatus::Medium => "medium",
            AlertStatus::High => "high",
        }
    }
}

/// Drowsiness view of the snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrowsinessStatus {
    pub ear_value: f32,
    pub is_drowsy: bool,
    pub blink_count: u32,
    pub yawn_count: u32,
    pub head_pose: HeadPose,
    drowsiness_level: u8,
    alert_status: AlertStatus,
    pub face_detected: bool,
}

impl Default for DrowsinessStatus {
    fn default() -> Self {
        Self {
            ear_value: 0.0,
            is_drowsy: false,
            blink_count: 0,
            yawn_count: 0,
            head_pose: HeadPose::default(),
            drowsiness_level: 0,
            alert_status: AlertStatus::Normal,
            face_detected: false,
        }
    }
}

impl DrowsinessStatus {
    pub fn drowsiness_level(&self) -> u8 {
        self.drowsiness_level
    }

    pub fn alert_status(&self) -> AlertStatus {
        self.alert_status
    }

    /// Set the level (clamped) and the alert status that follows from it
    pub fn set_level(&mut self, level: u8) {
        self.drowsiness_level = level.min(MAX_DROWSINESS_LEVEL);
        self.alert_status = AlertStatus::from_level(self.drowsiness_level);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionRecord {
    pub emotion: Emotion,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

/// Emotion view of the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmotionStatus {
    pub current_emotion: Emotion,
    pub confidence: f32,
    pub emotion_history: History<EmotionRecord>,
}

/// Phone view of the snapshot; `last_detected` latches on positive detections
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhoneStatus {
    pub is_detected: bool,
    pub confidence: f32,
    pub last_detected: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartRateRecord {
    pub bpm: u32,
    pub status: HeartRateStatus,
    pub timestamp: DateTime<Utc>,
}

/// Heart-rate view of the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeartRateView {
    pub bpm: u32,
    pub status: HeartRateStatus,
    pub history: History<HeartRateRecord>,
}

/// Everything the pipeline knows about the driver right now
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub drowsiness: DrowsinessStatus,
    pub emotion: EmotionStatus,
    pub phone: PhoneStatus,
    pub heart_rate: HeartRateView,
}

/// Flattened drowsiness subset used by dashboard polling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrowsinessData {
    pub ear: f32,
    pub blink_count: u32,
    pub yawn_count: u32,
    pub drowsiness_level: u8,
    pub face_detected: bool,
    pub head_pose: HeadPose,
}

impl From<&DrowsinessStatus> for DrowsinessData {
    fn from(status: &DrowsinessStatus) -> Self {
        Self {
            ear: status.ear_value,
            blink_count: status.blink_count,
            yawn_count: status.yawn_count,
            drowsiness_level: status.drowsiness_level,
            face_detected: status.face_detected,
            head_pose: status.head_pose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_thresholds() {
        assert_eq!(AlertStatus::from_level(0), AlertStatus::Normal);
        assert_eq!(AlertStatus::from_level(40), AlertStatus::Normal);
        assert_eq!(AlertStatus::from_level(41), AlertStatus::Medium);
        assert_eq!(AlertStatus::from_level(70), AlertStatus::Medium);
        assert_eq!(AlertStatus::from_level(71), AlertStatus::High);
        assert_eq!(AlertStatus::from_level(100), AlertStatus::High);
    }

    #[test]
    fn test_set_level_clamps() {
        let mut status = DrowsinessStatus::default();
        status.set_level(250);
        assert_eq!(status.drowsiness_level(), 100);
        assert_eq!(status.alert_status(), AlertStatus::High);
    }

    #[test]
    fn test_default_snapshot_shape() {
        let json = serde_json::to_value(AggregateSnapshot::default()).unwrap();
        assert_eq!(json["drowsiness"]["alert_status"], "normal");
        assert_eq!(json["drowsiness"]["drowsiness_level"], 0);
        assert_eq!(json["drowsiness"]["face_detected"], false);
        assert_eq!(json["drowsiness"]["head_pose"]["x"], 0.0);
        assert_eq!(json["emotion"]["current_emotion"], "neutral");
        assert_eq!(json["emotion"]["emotion_history"], serde_json::json!([]));
        assert!(json["phone"]["last_detected"].is_null());
        assert_eq!(json["heart_rate"]["status"], "normal");
        assert_eq!(json["heart_rate"]["history"], serde_json::json!([]));
    }
}
