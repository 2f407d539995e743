//! Alert Manager Implementation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::AlertKind;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Confidence threshold for alerts (default: 0.3)
    pub confidence_threshold: f64,
    /// Cooldown period between duplicate alerts (seconds)
    pub cooldown_seconds: u64,
    /// Maximum alerts per hour before throttling
    pub max_alerts_per_hour: usize,
    /// Alerts kept in the in-memory history
    pub history_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            cooldown_seconds: 30,
            max_alerts_per_hour: 60,
            history_capacity: 100,
        }
    }
}

/// State of an alert
#[derive(Debug, Clone)]
pub struct AlertState {
    /// Last time this alert was fired
    pub last_fired: Instant,
    /// Number of times fired
    pub fire_count: usize,
}

/// Alert manager for deduplication and throttling
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Alert states by kind
    states: HashMap<AlertKind, AlertState>,
    /// Alerts fired in current hour
    hourly_count: usize,
    /// Hour start time
    hour_start: Instant,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            states: HashMap::new(),
            hourly_count: 0,
            hour_start: Instant::now(),
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Check if an alert should be fired based on confidence and deduplication
    pub fn should_fire(&mut self, kind: AlertKind, confidence: f64) -> bool {
        if confidence < self.config.confidence_threshold {
            debug!(
                "{} alert suppressed: confidence {} < threshold {}",
                kind.as_str(),
                confidence,
                self.config.confidence_threshold
            );
            return false;
        }

        if self.hour_start.elapsed() > Duration::from_secs(3600) {
            self.hourly_count = 0;
            self.hour_start = Instant::now();
        }

        if self.hourly_count >= self.config.max_alerts_per_hour {
            warn!("Alert throttled: max alerts per hour reached");
            return false;
        }

        if let Some(state) = self.states.get(&kind) {
            let cooldown = Duration::from_secs(self.config.cooldown_seconds);
            if state.last_fired.elapsed() < cooldown {
                debug!("{} alert suppressed: in cooldown period", kind.as_str());
                return false;
            }
        }

        true
    }

    /// Record that an alert was fired
    pub fn record_fire(&mut self, kind: AlertKind) {
        self.hourly_count += 1;

        let state = self.states.entry(kind).or_insert(AlertState {
            last_fired: Instant::now(),
            fire_count: 0,
        });
        state.last_fired = Instant::now();
        state.fire_count += 1;

        info!("Alert recorded: {} (count: {})", kind.as_str(), state.fire_count);
    }

    /// Times an alert kind has fired
    pub fn fire_count(&self, kind: AlertKind) -> usize {
        self.states.get(&kind).map_or(0, |s| s.fire_count)
    }

    /// Get hourly alert count
    pub fn hourly_count(&self) -> usize {
        self.hourly_count
    }

    /// Clear all alert states
    pub fn clear(&mut self) {
        self.states.clear();
        self.hourly_count = 0;
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
