//! Shared application state and camera control

use alerting::{AlertLog, AlertMonitor};
use bytes::Bytes;
use camera_capture::{CameraManager, CapturePump, VideoFrame};
use frame_mailbox::FrameMailbox;
use frame_scheduler::{DetectorPipeline, ProcessingScheduler, SchedulerError};
use fusion::AggregationStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use stream_renderer::StreamRenderer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::music::MusicPlayer;

/// Result of a start/stop request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlOutcome {
    pub success: bool,
    pub message: String,
}

impl ControlOutcome {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub config: AppConfig,
    pub mailbox: Arc<FrameMailbox<VideoFrame>>,
    pub store: Arc<AggregationStore>,
    pub camera: Arc<CameraManager>,
    pub scheduler: ProcessingScheduler,
    pub renderer: Arc<StreamRenderer>,
    pub alerts: Arc<AlertMonitor>,
    pub music: MusicPlayer,
    /// Prometheus exporter, when a recorder was installed
    pub metrics: Option<PrometheusHandle>,
    /// Local capture thread; also serializes start/stop
    pump: Mutex<Option<CapturePump>>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire up the pipeline. `placeholder` is the JPEG shown when no frame
    /// is available.
    pub fn new(
        config: AppConfig,
        placeholder: Bytes,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, SchedulerError> {
        let mailbox = Arc::new(FrameMailbox::new());
        let store = Arc::new(AggregationStore::new());
        let camera = Arc::new(CameraManager::new(config.camera.clone()));

        let scheduler = ProcessingScheduler::new(
            config.scheduler.clone(),
            Arc::clone(&mailbox),
            Arc::clone(&store),
            DetectorPipeline::standard(&config.dms),
        );

        let alerts = Arc::new(AlertMonitor::new(
            config.alerts.clone(),
            Arc::new(AlertLog::new(config.alerts.history_capacity)),
        ));
        scheduler.add_observer(alerts.clone());

        let renderer = Arc::new(StreamRenderer::new(
            config.renderer.clone(),
            Arc::clone(&mailbox),
            Arc::clone(&store),
            placeholder,
        ));

        if config.scheduler.autostart {
            scheduler.start()?;
        }

        Ok(Self {
            config,
            mailbox,
            store,
            camera,
            scheduler,
            renderer,
            alerts,
            music: MusicPlayer::new(),
            metrics,
            pump: Mutex::new(None),
            start_time: Instant::now(),
        })
    }

    /// Open the camera, prime the mailbox and start processing.
    ///
    /// Blocks on device I/O; call from a blocking context.
    pub fn start_detection(&self) -> ControlOutcome {
        let mut pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(e) = self.camera.open() {
            warn!("Camera open failed: {}", e);
            return ControlOutcome::failed("Failed to initialize camera");
        }

        match self.camera.read_once() {
            Ok(frame) => {
                self.mailbox.put(frame);
            }
            Err(e) => {
                warn!("Initial camera read failed: {}", e);
                if pump.as_ref().map_or(true, CapturePump::is_finished) {
                    self.camera.close();
                }
                return ControlOutcome::failed("Failed to read from camera");
            }
        }

        if pump.as_ref().map_or(true, CapturePump::is_finished) {
            match CapturePump::spawn(Arc::clone(&self.camera), Arc::clone(&self.mailbox)) {
                Ok(p) => *pump = Some(p),
                Err(e) => {
                    error!("Failed to spawn capture pump: {}", e);
                    self.camera.close();
                    return ControlOutcome::failed(format!("Error: {}", e));
                }
            }
        }

        if let Err(e) = self.scheduler.start() {
            error!("{}", e);
            return ControlOutcome::failed(format!("Error: {}", e));
        }

        info!("Drowsiness detection started");
        ControlOutcome::ok("Drowsiness detection started")
    }

    /// Stop capture and processing, release the camera and drop the
    /// pending frame.
    ///
    /// The capture pump's pacing and retry sleeps are interrupted, so this
    /// waits for at most one in-flight device read and never for a detector
    /// tick.
    pub fn stop_detection(&self) -> ControlOutcome {
        let mut pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner);

        let pump = pump.take();
        if let Some(p) = &pump {
            p.signal_stop();
        }
        self.camera.close();
        if let Some(p) = pump {
            p.stop();
        }

        self.mailbox.clear();
        self.scheduler.stop();

        info!("Drowsiness detection stopped");
        ControlOutcome::ok("Drowsiness detection stopped")
    }

    /// True while the scheduler worker exists
    pub fn is_processing(&self) -> bool {
        self.scheduler.active_workers() > 0
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
