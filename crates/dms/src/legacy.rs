//! Adapter for EAR-threshold drowsiness detectors
//!
//! Older detectors only report `(is_drowsy, ear)` per frame and keep no
//! blink count. The adapter turns that into a regular `Detector`, counting
//! a blink whenever the EAR falls under the threshold. It is a compatibility
//! path; `EyeStateAnalyzer` counts blinks itself.

use camera_capture::VideoFrame;

use crate::reading::{CounterUpdate, DetectorResult, DrowsinessReading};
use crate::{Detector, DetectorError, DetectorKind};

/// EAR under which a legacy frame counts as a blink
pub const LEGACY_BLINK_EAR: f32 = 0.25;

/// Detector that only reports a drowsy flag and an eye aspect ratio
pub trait LegacyDrowsinessDetector: Send {
    /// Returns `(is_drowsy, ear)`
    fn detect_drowsiness(&mut self, frame: &VideoFrame) -> Result<(bool, f32), DetectorError>;
}

/// Wraps a `LegacyDrowsinessDetector` as a `Detector`
pub struct LegacyEarAdapter<D> {
    inner: D,
    blink_threshold: f32,
}

impl<D: LegacyDrowsinessDetector> LegacyEarAdapter<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            blink_threshold: LEGACY_BLINK_EAR,
        }
    }

    pub fn with_threshold(inner: D, blink_threshold: f32) -> Self {
        Self {
            inner,
            blink_threshold,
        }
    }
}

impl<D: LegacyDrowsinessDetector> Detector for LegacyEarAdapter<D> {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Drowsiness
    }

    fn analyze(&mut self, frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
        let (is_drowsy, ear) = self.inner.detect_drowsiness(frame)?;
        let blinks = u32::from(ear < self.blink_threshold);

        Ok(Some(DetectorResult::Drowsiness(DrowsinessReading {
            ear: Some(ear),
            is_drowsy: Some(is_drowsy),
            blinks: Some(CounterUpdate::Delta(blinks)),
            yawns: None,
            head_pose: None,
            face_detected: Some(true),
        })))
    }
}
