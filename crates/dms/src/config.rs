//! DMS configuration

use serde::{Deserialize, Serialize};

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Interval between analyzed frames (milliseconds); matches the scheduler tick
    pub frame_interval_ms: u64,

    /// Eye-aspect-ratio below which the eyes count as closed
    pub ear_threshold: f32,

    /// Eyes closed threshold for drowsiness (milliseconds)
    pub drowsiness_threshold_ms: u64,

    /// Minimum luminance spread in the face region to accept a face
    pub face_contrast_threshold: f32,

    /// Mouth-to-face brightness ratio under which the mouth counts as open
    pub yawn_darkness_ratio: f32,

    /// Consecutive open-mouth frames that make a yawn
    pub yawn_min_frames: u32,

    /// Share of dark pixels beside the face that signals a handheld phone
    pub phone_dark_ratio: f32,

    /// Heart-rate window length (frames)
    pub heart_rate_window: usize,

    /// Plausible pulse band (Hz)
    pub pulse_band_hz: (f64, f64),
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 100,
            ear_threshold: 0.25,
            drowsiness_threshold_ms: 1500,
            face_contrast_threshold: 8.0,
            yawn_darkness_ratio: 0.6,
            yawn_min_frames: 10,
            phone_dark_ratio: 0.35,
            heart_rate_window: 100,
            pulse_band_hz: (0.7, 3.0),
        }
    }
}

impl DmsConfig {
    /// Consecutive closed-eye frames that count as drowsy
    pub fn drowsy_frames(&self) -> u32 {
        (self.drowsiness_threshold_ms / self.frame_interval_ms.max(1)).max(1) as u32
    }

    /// Sampling rate of per-frame signals (Hz)
    pub fn sample_rate_hz(&self) -> f64 {
        1000.0 / self.frame_interval_ms.max(1) as f64
    }
}
