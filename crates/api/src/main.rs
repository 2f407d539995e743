//! Driver Monitor - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.log_level, config.log_json);

    info!("=== Driver Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Camera: {} ({}x{} @ {} fps)",
        config.camera.device, config.camera.width, config.camera.height, config.camera.fps
    );

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics exporter unavailable: {}", e);
            None
        }
    };

    run_server(config, metrics).await
}
