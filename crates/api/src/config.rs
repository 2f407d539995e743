//! Application configuration
//!
//! Layers, lowest priority first: built-in defaults, an optional config file
//! (`driver-monitor.toml`, or the path in `DRIVER_MONITOR_CONFIG`), then
//! `DRIVER_MONITOR_*` environment variables with `__` between nested keys,
//! e.g. `DRIVER_MONITOR_CAMERA__DEVICE=/srv/frames`.

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use dms::DmsConfig;
use frame_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stream_renderer::RendererConfig;
use thiserror::Error;
use tracing::warn;

use crate::rate_limit::RateLimitConfig;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "DRIVER_MONITOR_CONFIG";

/// Config file looked up when no path is given (any supported extension)
pub const DEFAULT_CONFIG_FILE: &str = "driver-monitor";

const ENV_PREFIX: &str = "DRIVER_MONITOR";

/// Default request body cap for frame uploads
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listen address
    pub bind_addr: String,
    /// Max log level (`trace` .. `error`)
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Directory holding `placeholder.jpg`
    pub static_dir: PathBuf,
    /// Largest accepted body on the frame upload endpoints
    pub max_frame_bytes: usize,
    pub camera: CameraConfig,
    pub scheduler: SchedulerConfig,
    pub renderer: RendererConfig,
    pub dms: DmsConfig,
    pub alerts: AlertConfig,
    /// Limits for the camera control endpoints
    pub rate_limit: RateLimitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            static_dir: PathBuf::from("static"),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            camera: CameraConfig::default(),
            scheduler: SchedulerConfig::default(),
            renderer: RendererConfig::default(),
            dms: DmsConfig::default(),
            alerts: AlertConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::load_from(&path)
    }

    /// Load with `path` as the (optional) config file
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Validation("bind_addr must not be empty".into()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Validation(format!(
                "camera resolution {}x{} is empty",
                self.camera.width, self.camera.height
            )));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Validation("max_frame_bytes must be positive".into()));
        }
        if !(1..=100).contains(&self.renderer.jpeg_quality) {
            return Err(ConfigError::Validation(format!(
                "renderer.jpeg_quality {} outside 1..=100",
                self.renderer.jpeg_quality
            )));
        }
        if self.dms.frame_interval_ms != self.scheduler.tick_interval_ms {
            // Timing-based thresholds assume one analyzed frame per tick.
            warn!(
                "dms.frame_interval_ms ({}) differs from scheduler.tick_interval_ms ({})",
                self.dms.frame_interval_ms, self.scheduler.tick_interval_ms
            );
        }
        Ok(())
    }
}
