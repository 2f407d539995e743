//! Rate limiting for the camera control endpoints
//!
//! GCRA limiter from tower_governor. Opening and releasing the camera is
//! slow and exclusive, so the control routes share one global bucket rather
//! than a per-client one.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::GlobalKeyExtractor;

/// Governor config shared by the control routes.
/// StateInformationMiddleware is used when use_headers() is called to add X-RateLimit-* headers
pub type ControlGovernorConfig = GovernorConfig<GlobalKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 2,
            burst_size: 5,
        }
    }
}

/// Build the governor config, or `None` if the values are rejected.
///
/// Adds X-RateLimit-* headers to responses for quota visibility.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<ControlGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second.max(1))
        .burst_size(config.burst_size.max(1))
        .key_extractor(GlobalKeyExtractor)
        .use_headers()
        .finish()
        .map(Arc::new)
}
