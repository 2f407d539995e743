//! Processing Scheduler Implementation

use camera_capture::VideoFrame;
use dms::DetectorKind;
use frame_mailbox::FrameMailbox;
use fusion::{AggregationStore, SnapshotObserver};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::pipeline::{panic_message, DetectorPipeline, TickReport};

/// Scheduler errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Failed to spawn scheduler worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Configuration for the processing scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between pipeline ticks (default: 100 ms)
    pub tick_interval_ms: u64,
    /// Start the worker at boot instead of on the first camera start
    pub autostart: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            autostart: false,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// No worker thread
    Idle,
    /// Worker ticking
    Running,
    /// Worker told to exit at its next loop boundary
    Stopping,
}

struct Shared {
    mailbox: Arc<FrameMailbox<VideoFrame>>,
    store: Arc<AggregationStore>,
    pipeline: Mutex<DetectorPipeline>,
    kinds: Vec<DetectorKind>,
    observers: Mutex<Vec<Arc<dyn SnapshotObserver>>>,
    control: Mutex<WorkerState>,
    wake: Condvar,
    active_workers: AtomicUsize,
    ticks: AtomicU64,
    interval: Duration,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, WorkerState> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process the latest frame, if there is one
    fn tick(&self) -> Option<TickReport> {
        let frame = self.mailbox.peek()?;

        let report = self
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .run_into(&frame, &self.store);
        self.ticks.fetch_add(1, Ordering::Relaxed);
        counter!("pipeline_ticks_total").increment(1);

        if report.applied > 0 {
            let observers = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if !observers.is_empty() {
                let snapshot = self.store.snapshot();
                for observer in observers {
                    if let Err(payload) =
                        panic::catch_unwind(AssertUnwindSafe(|| observer.observe(&snapshot)))
                    {
                        error!("Snapshot observer panicked: {}", panic_message(&*payload));
                        counter!("observer_failures_total").increment(1);
                    }
                }
            }
        }

        Some(report)
    }

    fn worker_exited(&self) {
        let remaining = self.active_workers.fetch_sub(1, Ordering::SeqCst) - 1;
        gauge!("scheduler_workers").set(remaining as f64);
    }
}

/// Restores the worker bookkeeping if the worker thread unwinds
struct WorkerGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.shared.control();
            *state = WorkerState::Idle;
            self.shared.worker_exited();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    let mut guard = WorkerGuard {
        shared: &shared,
        armed: true,
    };
    info!("Processing scheduler started ({:?} tick)", shared.interval);

    loop {
        {
            let mut state = shared.control();
            if *state == WorkerState::Stopping {
                // Exit and bookkeeping happen under the control lock so a
                // concurrent start() sees either this worker or none.
                *state = WorkerState::Idle;
                shared.worker_exited();
                guard.armed = false;
                break;
            }
        }

        if shared.tick().is_none() {
            debug!("No frame available");
        }

        let state = shared.control();
        let _ = shared
            .wake
            .wait_timeout_while(state, shared.interval, |s| *s == WorkerState::Running)
            .unwrap_or_else(PoisonError::into_inner);
    }

    info!("Processing scheduler stopped");
}

/// Background task that drives the detector pipeline at a fixed cadence
pub struct ProcessingScheduler {
    shared: Arc<Shared>,
}

impl ProcessingScheduler {
    pub fn new(
        config: SchedulerConfig,
        mailbox: Arc<FrameMailbox<VideoFrame>>,
        store: Arc<AggregationStore>,
        pipeline: DetectorPipeline,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                mailbox,
                store,
                kinds: pipeline.kinds(),
                pipeline: Mutex::new(pipeline),
                observers: Mutex::new(Vec::new()),
                control: Mutex::new(WorkerState::Idle),
                wake: Condvar::new(),
                active_workers: AtomicUsize::new(0),
                ticks: AtomicU64::new(0),
                interval: config.tick_interval(),
            }),
        }
    }

    /// Register an observer called with the snapshot after each productive tick
    pub fn add_observer(&self, observer: Arc<dyn SnapshotObserver>) {
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Start the worker.
    ///
    /// Returns `Ok(false)` if it was already running. A worker that is still
    /// winding down from `stop()` is resumed rather than replaced, so there
    /// is never more than one.
    pub fn start(&self) -> Result<bool, SchedulerError> {
        let mut state = self.shared.control();
        match *state {
            WorkerState::Running => {
                debug!("Processing scheduler already running");
                Ok(false)
            }
            WorkerState::Stopping => {
                info!("Resuming processing scheduler");
                *state = WorkerState::Running;
                Ok(true)
            }
            WorkerState::Idle => {
                let workers = self.shared.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
                let shared = Arc::clone(&self.shared);
                match thread::Builder::new()
                    .name("frame-scheduler".into())
                    .spawn(move || worker_loop(shared))
                {
                    Ok(_) => {
                        *state = WorkerState::Running;
                        gauge!("scheduler_workers").set(workers as f64);
                        Ok(true)
                    }
                    Err(e) => {
                        self.shared.active_workers.fetch_sub(1, Ordering::SeqCst);
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Ask the worker to exit at its next loop boundary.
    ///
    /// Never waits for an in-progress tick.
    pub fn stop(&self) {
        let mut state = self.shared.control();
        if *state == WorkerState::Running {
            info!("Stopping processing scheduler");
            *state = WorkerState::Stopping;
            self.shared.wake.notify_all();
        }
    }

    /// Run one tick on the calling thread
    pub fn tick_once(&self) -> Option<TickReport> {
        self.shared.tick()
    }

    pub fn state(&self) -> WorkerState {
        *self.shared.control()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Live worker threads (0 or 1)
    pub fn active_workers(&self) -> usize {
        self.shared.active_workers.load(Ordering::SeqCst)
    }

    /// Ticks that processed a frame
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Registered detectors, in execution order
    pub fn detector_kinds(&self) -> &[DetectorKind] {
        &self.shared.kinds
    }

    pub fn store(&self) -> &Arc<AggregationStore> {
        &self.shared.store
    }
}

impl Drop for ProcessingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
