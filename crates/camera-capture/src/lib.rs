//! Camera Capture Library for Driver Monitoring
//!
//! Provides the capture side of the pipeline:
//! - `VideoFrame`, the immutable RGB frame every other crate consumes
//! - Frame decoding for externally pushed (base64) images
//! - Frame sources (image sequence replay, synthetic test pattern)
//! - `CameraManager`, the single owner of the open capture device
//! - `CapturePump`, which feeds frames from the camera into the mailbox

pub mod frame;
pub mod manager;
pub mod pump;
pub mod source;

pub use frame::{DecodeError, VideoFrame};
pub use manager::{CameraManager, CameraState};
pub use pump::CapturePump;
pub use source::{open_source, FrameSource, ImageSequenceSource, TestPatternSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to read frame: {0}")]
    ReadFailure(String),

    #[error("Camera is not open")]
    NotOpen,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device to open: `test-pattern`, an image file, or a directory of frames
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "test-pattern".to_string(),
            width: 640,
            height: 480,
            fps: 15,
        }
    }
}

impl CameraConfig {
    /// Interval between frames at the configured rate
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }
}
