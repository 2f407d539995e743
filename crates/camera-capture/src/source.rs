//! Frame sources backing the camera

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{CameraConfig, CameraError, VideoFrame};

/// Device name selecting the synthetic source
pub const TEST_PATTERN_DEVICE: &str = "test-pattern";

/// A device that yields frames
pub trait FrameSource: Send {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Read the next frame (blocking)
    fn read(&mut self) -> Result<VideoFrame, CameraError>;
}

/// Open the source named by `config.device`
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    if config.device == TEST_PATTERN_DEVICE {
        return Ok(Box::new(TestPatternSource::new(config.width, config.height)));
    }

    let path = Path::new(&config.device);
    if !path.exists() {
        return Err(CameraError::DeviceUnavailable(format!(
            "{} does not exist",
            config.device
        )));
    }

    Ok(Box::new(ImageSequenceSource::open(path)?))
}

/// Synthetic source: a gradient with a bar sweeping across it
pub struct TestPatternSource {
    width: u32,
    height: u32,
    sequence: u32,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            sequence: 0,
        }
    }
}

impl FrameSource for TestPatternSource {
    fn describe(&self) -> String {
        format!("test pattern {}x{}", self.width, self.height)
    }

    fn read(&mut self) -> Result<VideoFrame, CameraError> {
        let bar_x = (self.sequence * 8) % self.width;
        let (w, h) = (self.width, self.height);
        let img = RgbImage::from_fn(w, h, |x, y| {
            if x.abs_diff(bar_x) < 10 {
                Rgb([240, 240, 240])
            } else {
                Rgb([(x * 255 / w) as u8, (y * 255 / h) as u8, 96])
            }
        });

        let frame = VideoFrame::from_rgb_image(img, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }
}

/// Replays still images (a single file or a directory of frames) in a loop
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    position: usize,
    sequence: u32,
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png" | "bmp"))
        .unwrap_or(false)
}

impl ImageSequenceSource {
    /// Open a file or a directory of image files
    pub fn open(path: &Path) -> Result<Self, CameraError> {
        let mut frames = if path.is_dir() {
            std::fs::read_dir(path)
                .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image_file(p))
                .collect::<Vec<_>>()
        } else {
            vec![path.to_path_buf()]
        };
        frames.sort();

        if frames.is_empty() {
            return Err(CameraError::DeviceUnavailable(format!(
                "no image frames in {}",
                path.display()
            )));
        }

        info!("Opened image sequence with {} frames from {}", frames.len(), path.display());
        Ok(Self {
            frames,
            position: 0,
            sequence: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn describe(&self) -> String {
        format!("image sequence ({} frames)", self.frames.len())
    }

    fn read(&mut self) -> Result<VideoFrame, CameraError> {
        let path = &self.frames[self.position];
        self.position = (self.position + 1) % self.frames.len();

        let img = image::open(path)
            .map_err(|e| CameraError::ReadFailure(format!("{}: {}", path.display(), e)))?;
        debug!("Read frame {} from {}", self.sequence, path.display());

        let frame = VideoFrame::from_rgb_image(img.to_rgb8(), self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }
}
