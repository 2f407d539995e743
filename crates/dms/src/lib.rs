//! Driver Monitoring System (DMS)
//!
//! Per-frame driver state analyzers behind a single capability:
//! given a frame, optionally produce a partial result.
//! - Eye state and head pose (drowsiness, blinks, yawns)
//! - Emotion classification
//! - Handheld phone detection
//! - Remote photoplethysmography heart rate
//!
//! "Nothing detected this frame" is `Ok(None)`; `Err` is reserved for
//! faults inside the analyzer.

pub mod config;
pub mod detector;
pub mod legacy;
pub mod pulse;
pub mod reading;
pub mod state;

pub use config::DmsConfig;
pub use detector::{EmotionClassifier, EyeStateAnalyzer, HeartRateMonitor, PhoneDetector};
pub use legacy::{LegacyDrowsinessDetector, LegacyEarAdapter};
pub use reading::{
    CounterUpdate, DetectorResult, DrowsinessReading, Emotion, EmotionReading, HeadPose,
    HeartRateReading, HeartRateStatus, PhoneReading,
};

use camera_capture::VideoFrame;
use serde::Serialize;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Detector panicked: {0}")]
    Panicked(String),
}

/// Detector identity; declaration order is pipeline execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Drowsiness,
    Emotion,
    Phone,
    HeartRate,
}

impl DetectorKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Drowsiness => "drowsiness",
            DetectorKind::Emotion => "emotion",
            DetectorKind::Phone => "phone",
            DetectorKind::HeartRate => "heart_rate",
        }
    }

    /// Component name reported by the status endpoint
    pub fn component_name(&self) -> &'static str {
        match self {
            DetectorKind::Drowsiness => "drowsiness_detector",
            DetectorKind::Emotion => "emotion_recognizer",
            DetectorKind::Phone => "phone_detector",
            DetectorKind::HeartRate => "heart_rate_monitor",
        }
    }

    pub const ALL: [DetectorKind; 4] = [
        DetectorKind::Drowsiness,
        DetectorKind::Emotion,
        DetectorKind::Phone,
        DetectorKind::HeartRate,
    ];
}

/// A per-frame analyzer
pub trait Detector: Send {
    /// Which signal this detector produces
    fn kind(&self) -> DetectorKind;

    /// Analyze one frame.
    ///
    /// Must return within a bounded per-frame budget.
    fn analyze(&mut self, frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError>;
}

/// The default analyzer set, in pipeline order
pub fn standard_detectors(config: &DmsConfig) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(EyeStateAnalyzer::new(config)),
        Box::new(EmotionClassifier::new(config)),
        Box::new(PhoneDetector::new(config)),
        Box::new(HeartRateMonitor::new(config)),
    ]
}
