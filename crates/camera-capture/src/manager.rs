//! Camera lifecycle management
//!
//! `CameraManager` is the only holder of the open capture device. Other
//! components never touch the device directly; they receive frames through
//! the mailbox, which the capture pump fills by calling `read_once`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::source::{open_source, FrameSource};
use crate::{CameraConfig, CameraError, VideoFrame};

/// Opens a frame source for a configuration
pub type SourceOpener =
    dyn Fn(&CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> + Send + Sync;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Closed,
    Open,
}

/// Owner of the capture device
pub struct CameraManager {
    config: CameraConfig,
    opener: Box<SourceOpener>,
    device: Mutex<Option<Box<dyn FrameSource>>>,
    frames_read: AtomicU64,
}

impl CameraManager {
    /// Create a manager that opens devices with `open_source`
    pub fn new(config: CameraConfig) -> Self {
        Self::with_opener(config, open_source)
    }

    /// Create a manager with a custom device opener
    pub fn with_opener<F>(config: CameraConfig, opener: F) -> Self
    where
        F: Fn(&CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> + Send + Sync + 'static,
    {
        Self {
            config,
            opener: Box::new(opener),
            device: Mutex::new(None),
            frames_read: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn FrameSource>>> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Camera configuration
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Acquire the device. Opening an already open camera is a no-op.
    pub fn open(&self) -> Result<(), CameraError> {
        let mut device = self.lock();
        if device.is_some() {
            debug!("Camera already open");
            return Ok(());
        }

        match (self.opener)(&self.config) {
            Ok(source) => {
                info!("Camera opened: {}", source.describe());
                *device = Some(source);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to open camera {}: {}", self.config.device, e);
                Err(e)
            }
        }
    }

    /// Pull one frame from the open device
    pub fn read_once(&self) -> Result<VideoFrame, CameraError> {
        let mut device = self.lock();
        let source = device.as_mut().ok_or(CameraError::NotOpen)?;
        let frame = source.read()?;
        self.frames_read.fetch_add(1, Ordering::Relaxed);
        Ok(frame)
    }

    /// Release the device. Safe to call when already closed.
    pub fn close(&self) {
        if let Some(source) = self.lock().take() {
            info!("Camera released: {}", source.describe());
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> CameraState {
        if self.lock().is_some() {
            CameraState::Open
        } else {
            CameraState::Closed
        }
    }

    /// Check if the device is open
    pub fn is_open(&self) -> bool {
        self.state() == CameraState::Open
    }

    /// Frames read since creation
    pub fn frames_read(&self) -> u64 {
        self.frames_read.load(Ordering::Relaxed)
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TestPatternSource;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct EmptyDevice;

    impl FrameSource for EmptyDevice {
        fn describe(&self) -> String {
            "empty".into()
        }

        fn read(&mut self) -> Result<VideoFrame, CameraError> {
            Err(CameraError::ReadFailure("no data".into()))
        }
    }

    fn pattern_camera() -> CameraManager {
        CameraManager::with_opener(CameraConfig::default(), |c| {
            Ok(Box::new(TestPatternSource::new(c.width, c.height)) as Box<dyn FrameSource>)
        })
    }

    #[test]
    fn test_lifecycle() {
        let camera = pattern_camera();
        assert_eq!(camera.state(), CameraState::Closed);

        camera.open().unwrap();
        assert_eq!(camera.state(), CameraState::Open);

        let frame = camera.read_once().unwrap();
        assert_eq!((frame.width, frame.height), (640, 480));
        assert_eq!(camera.frames_read(), 1);

        camera.close();
        assert_eq!(camera.state(), CameraState::Closed);
    }

    #[test]
    fn test_close_is_idempotent() {
        let camera = pattern_camera();
        camera.close();
        camera.open().unwrap();
        camera.close();
        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_read_when_closed() {
        let camera = pattern_camera();
        assert!(matches!(camera.read_once(), Err(CameraError::NotOpen)));
    }

    #[test]
    fn test_open_twice_opens_device_once() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = opens.clone();
        let camera = CameraManager::with_opener(CameraConfig::default(), move |c| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TestPatternSource::new(c.width, c.height)) as Box<dyn FrameSource>)
        });

        camera.open().unwrap();
        camera.open().unwrap();
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_device_unavailable_is_recoverable() {
        let camera = CameraManager::with_opener(CameraConfig::default(), |_| {
            Err(CameraError::DeviceUnavailable("busy".into()))
        });

        assert!(matches!(camera.open(), Err(CameraError::DeviceUnavailable(_))));
        assert!(!camera.is_open());
        // A later attempt is still allowed
        assert!(camera.open().is_err());
    }

    #[test]
    fn test_read_failure() {
        let camera = CameraManager::with_opener(CameraConfig::default(), |_| {
            Ok(Box::new(EmptyDevice) as Box<dyn FrameSource>)
        });
        camera.open().unwrap();
        assert!(matches!(camera.read_once(), Err(CameraError::ReadFailure(_))));
        assert!(camera.is_open());
    }
}
