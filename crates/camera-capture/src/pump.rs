//! Local-capture pump: camera -> mailbox

use frame_mailbox::FrameMailbox;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{CameraError, CameraManager, VideoFrame};

/// Longest back-off between failed reads
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Stop flag the pump can sleep on
#[derive(Default)]
struct Shutdown {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Shutdown {
    fn signal(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout` or until signalled. Returns true if signalled.
    fn wait(&self, timeout: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .wake
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

/// Background thread copying camera frames into the mailbox
pub struct CapturePump {
    shutdown: Arc<Shutdown>,
    handle: Option<JoinHandle<()>>,
}

impl CapturePump {
    /// Spawn the pump at the camera's configured frame rate
    pub fn spawn(
        camera: Arc<CameraManager>,
        mailbox: Arc<FrameMailbox<VideoFrame>>,
    ) -> std::io::Result<Self> {
        let interval = camera.config().frame_interval();
        let shutdown = Arc::new(Shutdown::default());
        let shutdown_clone = shutdown.clone();

        let handle = thread::Builder::new()
            .name("capture-pump".into())
            .spawn(move || pump_loop(&camera, &mailbox, &shutdown_clone, interval))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Check if the pump thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Signal the pump to exit without waiting for it
    pub fn signal_stop(&self) {
        self.shutdown.signal();
    }

    /// Signal the pump and wait for it to exit.
    ///
    /// Interrupts any pacing or back-off sleep, so this waits at most for one
    /// in-flight device read. No frame is written to the mailbox after this
    /// returns.
    pub fn stop(mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Capture pump panicked");
            }
        }
    }
}

impl Drop for CapturePump {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

fn pump_loop(
    camera: &CameraManager,
    mailbox: &FrameMailbox<VideoFrame>,
    shutdown: &Shutdown,
    interval: Duration,
) {
    info!("Capture pump started ({:?} per frame)", interval);
    let mut backoff = interval;

    while !shutdown.is_set() {
        match camera.read_once() {
            Ok(frame) => {
                if shutdown.is_set() {
                    break;
                }
                mailbox.put(frame);
                backoff = interval;
                if shutdown.wait(interval) {
                    break;
                }
            }
            Err(CameraError::NotOpen) => {
                debug!("Camera closed, capture pump exiting");
                break;
            }
            Err(e) => {
                warn!("Camera read failed, retrying in {:?}: {}", backoff, e);
                if shutdown.wait(backoff) {
                    break;
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }

    info!("Capture pump stopped");
}
