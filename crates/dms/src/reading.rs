//! Per-frame analyzer outputs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Head pose angles (degrees)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    /// Pitch (up-down tilt)
    pub x: f32,
    /// Yaw (left-right rotation)
    pub y: f32,
    /// Roll (side tilt)
    pub z: f32,
}

/// How a detector reports a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterUpdate {
    /// Events seen since the previous frame
    Delta(u32),
    /// Detector's own running total
    Total(u32),
}

impl CounterUpdate {
    /// Apply to a monotonic counter. A running total lower than the
    /// current value is ignored.
    pub fn apply(self, current: u32) -> u32 {
        match self {
            CounterUpdate::Delta(n) => current.saturating_add(n),
            CounterUpdate::Total(n) => current.max(n),
        }
    }
}

/// Eye/face state for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrowsinessReading {
    /// Eye aspect ratio
    pub ear: Option<f32>,
    /// Drowsy classification for this frame
    pub is_drowsy: Option<bool>,
    pub blinks: Option<CounterUpdate>,
    pub yawns: Option<CounterUpdate>,
    pub head_pose: Option<HeadPose>,
    pub face_detected: Option<bool>,
}

/// Emotion labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    #[default]
    Neutral,
}

impl Emotion {
    /// All labels in classifier output order
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion classification for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    pub label: Emotion,
    /// Confidence (0.0 to 1.0)
    pub confidence: f32,
}

/// Handheld phone detection for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneReading {
    pub is_detected: bool,
    pub confidence: f32,
}

/// Heart-rate classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartRateStatus {
    Low,
    #[default]
    Normal,
    High,
}

impl HeartRateStatus {
    /// Classify a pulse rate
    pub fn from_bpm(bpm: u32) -> Self {
        if bpm < 60 {
            HeartRateStatus::Low
        } else if bpm > 100 {
            HeartRateStatus::High
        } else {
            HeartRateStatus::Normal
        }
    }
}

/// Heart-rate estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateReading {
    pub bpm: u32,
    pub status: HeartRateStatus,
}

/// Output of one detector for one frame
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorResult {
    Drowsiness(DrowsinessReading),
    Emotion(EmotionReading),
    Phone(PhoneReading),
    HeartRate(HeartRateReading),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn counter_update() -> impl Strategy<Value = CounterUpdate> {
        prop_oneof![
            (0u32..1000).prop_map(CounterUpdate::Delta),
            any::<u32>().prop_map(CounterUpdate::Total),
        ]
    }

    #[test]
    fn test_counter_update() {
        assert_eq!(CounterUpdate::Delta(2).apply(5), 7);
        assert_eq!(CounterUpdate::Total(9).apply(5), 9);
        // Never decreases
        assert_eq!(CounterUpdate::Total(3).apply(5), 5);
        assert_eq!(CounterUpdate::Delta(1).apply(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_heart_rate_status() {
        assert_eq!(HeartRateStatus::from_bpm(45), HeartRateStatus::Low);
        assert_eq!(HeartRateStatus::from_bpm(60), HeartRateStatus::Normal);
        assert_eq!(HeartRateStatus::from_bpm(100), HeartRateStatus::Normal);
        assert_eq!(HeartRateStatus::from_bpm(101), HeartRateStatus::High);
    }

    #[test]
    fn test_emotion_labels() {
        assert_eq!(Emotion::default(), Emotion::Neutral);
        for emotion in Emotion::ALL {
            assert_eq!(emotion.to_string(), emotion.as_str());
        }
    }

    proptest! {
        #[test]
        fn prop_counter_never_decreases(
            start in any::<u32>(),
            updates in prop::collection::vec(counter_update(), 0..50),
        ) {
            let mut count = start;
            for update in updates {
                let next = update.apply(count);
                prop_assert!(next >= count);
                if let CounterUpdate::Total(n) = update {
                    prop_assert!(next >= n);
                }
                count = next;
            }
        }
    }
}
