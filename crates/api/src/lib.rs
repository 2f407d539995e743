//! Driver Monitor API Server
//!
//! HTTP ingress and egress for the driver monitoring pipeline: frame upload,
//! fused status views, camera control, alert history and the MJPEG feed.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod music;
pub mod rate_limit;
mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::{AppState, ControlOutcome};

use routes::{alerts, control, frame, results, status, video};

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let control_routes: Router<Arc<AppState>> = Router::new()
        .route("/api/start-drowsiness-detection", get(control::start_detection))
        .route("/api/stop-drowsiness-detection", get(control::stop_detection));
    let control_routes = match rate_limit::create_governor_config(&state.config.rate_limit) {
        Some(config) => control_routes.layer(GovernorLayer { config }),
        None => {
            warn!("Rate limit config rejected; control endpoints are unthrottled");
            control_routes
        }
    };

    let frame_routes: Router<Arc<AppState>> = Router::new()
        .route("/api/frame", post(frame::post_frame))
        .route("/detect", post(frame::post_frame))
        .layer(DefaultBodyLimit::max(state.config.max_frame_bytes));

    Router::new()
        .route("/api/status", get(status::get_status))
        .route("/status", get(status::get_status))
        .route("/detect/status", get(status::detect_status))
        .route("/api/results", get(results::get_results))
        .route("/api/drowsiness", get(results::get_drowsiness))
        .route("/api/emotion", get(results::get_emotion))
        .route("/api/phone", get(results::get_phone))
        .route("/api/heart-rate", get(results::get_heart_rate))
        .route("/api/drowsiness-data", get(results::get_drowsiness_data))
        .route("/api/alert-history", get(alerts::alert_history))
        .route("/api/trigger-sos", post(alerts::trigger_sos))
        .route("/api/music/current", get(routes::music::current))
        .route("/api/music/play", post(routes::music::play))
        .route("/api/music/stop", post(routes::music::stop))
        .route("/video_feed", get(video::video_feed))
        .route("/metrics", get(routes::metrics::render))
        .merge(frame_routes)
        .merge(control_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize logging.
///
/// A second call leaves the first subscriber in place.
pub fn init_logging(level: &str, json: bool) {
    let max_level = level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_target(true);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if installed.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Run the server until Ctrl-C
pub async fn run_server(config: AppConfig, metrics: Option<PrometheusHandle>) -> anyhow::Result<()> {
    let placeholder = stream_renderer::placeholder::load_or_create(
        &config.static_dir,
        config.renderer.jpeg_quality,
    )?;
    let addr = config.bind_addr.clone();

    let state = Arc::new(AppState::new(config, placeholder, metrics)?);
    let app = create_router(Arc::clone(&state));

    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    let cleanup = Arc::clone(&state);
    tokio::task::spawn_blocking(move || cleanup.stop_detection()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use base64::Engine;
    use futures::StreamExt;
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use tower::ServiceExt;

    fn test_state(device: &str) -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.camera.device = device.to_string();
        config.camera.width = 64;
        config.camera.height = 48;
        state_with(config)
    }

    fn state_with(config: AppConfig) -> Arc<AppState> {
        let placeholder = stream_renderer::placeholder::generate(80).unwrap();
        Arc::new(AppState::new(config, placeholder, None).unwrap())
    }

    fn png_base64() -> String {
        let image = RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, 128]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    /// A 1280x720 noise PNG; well over 2 MB once base64 encoded
    fn hd_png_base64() -> String {
        let mut seed: u32 = 0x2545_f491;
        let image = RgbImage::from_fn(1280, 720, |_, _| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let [r, g, b, _] = seed.to_le_bytes();
            Rgb([r, g, b])
        });
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(Arc::clone(state)).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_status() {
        let state = test_state("test-pattern");
        let (code, body) = send(&state, get("/api/status")).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["is_processing"], false);
        assert!(body["timestamp"].is_string());
        for component in [
            "drowsiness_detector",
            "emotion_recognizer",
            "phone_detector",
            "heart_rate_monitor",
            "music_player",
            "sos_alert",
        ] {
            assert_eq!(body["components"][component], "active", "{}", component);
        }

        let (code, alias) = send(&state, get("/status")).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(alias["status"], "online");

        let (_, detect) = send(&state, get("/detect/status")).await;
        assert_eq!(detect["status"], "online");
    }

    #[tokio::test]
    async fn test_frame_without_key_is_rejected() {
        let state = test_state("test-pattern");
        let (code, body) = send(&state, post_json("/api/frame", json!({}))).await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No frame data provided");
        assert!(state.mailbox.peek().is_none());
        assert_eq!(state.mailbox.stats().written, 0);
    }

    #[tokio::test]
    async fn test_frame_requires_json() {
        let state = test_state("test-pattern");
        let request = Request::builder()
            .method("POST")
            .uri("/api/frame")
            .body(Body::from("frame=abc"))
            .unwrap();
        let (code, body) = send(&state, request).await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Expected JSON request");
    }

    #[tokio::test]
    async fn test_frame_with_and_without_prefix() {
        let state = test_state("test-pattern");
        let encoded = png_base64();

        let (code, body) = send(&state, post_json("/api/frame", json!({ "frame": encoded }))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Frame received");
        let plain = state.mailbox.peek().unwrap();

        let prefixed = format!("data:image/png;base64,{}", encoded);
        let (code, _) = send(&state, post_json("/detect", json!({ "frame": prefixed }))).await;
        assert_eq!(code, StatusCode::OK);
        let decoded = state.mailbox.peek().unwrap();

        assert_eq!((decoded.width, decoded.height), (32, 24));
        assert_eq!(decoded.data, plain.data);
        assert_eq!(state.mailbox.stats().overwritten, 1);
    }

    #[tokio::test]
    async fn test_hd_frame_above_two_megabytes() {
        let state = test_state("test-pattern");
        let frame = format!("data:image/png;base64,{}", hd_png_base64());
        assert!(frame.len() > 2 * 1024 * 1024);

        let (code, body) = send(&state, post_json("/api/frame", json!({ "frame": frame }))).await;
        assert_eq!(code, StatusCode::OK, "{}", body);

        let decoded = state.mailbox.peek().unwrap();
        assert_eq!((decoded.width, decoded.height), (1280, 720));
    }

    #[tokio::test]
    async fn test_frame_over_limit_is_413() {
        let mut config = AppConfig::default();
        config.max_frame_bytes = 4096;
        let state = state_with(config);

        let frame = format!("data:image/png;base64,{}", "A".repeat(8192));
        let (code, body) = send(&state, post_json("/detect", json!({ "frame": frame }))).await;

        assert_eq!(code, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
        assert!(state.mailbox.peek().is_none());

        // Small bodies still pass through
        let (code, _) = send(&state, post_json("/detect", json!({ "frame": png_base64() }))).await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_undecodable_frame() {
        let state = test_state("test-pattern");
        let (code, body) = send(
            &state,
            post_json("/api/frame", json!({ "frame": "data:image/jpeg;base64,bm90IGFuIGltYWdl" })),
        )
        .await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to decode image"));
        assert!(state.mailbox.peek().is_none());
    }

    #[tokio::test]
    async fn test_results_shape() {
        let state = test_state("test-pattern");
        let (code, body) = send(&state, get("/api/results")).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["drowsiness"]["drowsiness_level"], 0);
        assert_eq!(body["drowsiness"]["alert_status"], "normal");
        assert!(body["emotion"]["emotion_history"].as_array().unwrap().is_empty());
        assert_eq!(body["phone"]["is_detected"], false);
        assert!(body["heart_rate"]["history"].is_array());

        let (_, data) = send(&state, get("/api/drowsiness-data")).await;
        for key in ["ear", "blink_count", "yawn_count", "drowsiness_level", "face_detected", "head_pose"] {
            assert!(data.get(key).is_some(), "missing {}", key);
        }

        for uri in ["/api/drowsiness", "/api/emotion", "/api/phone", "/api/heart-rate"] {
            let (code, _) = send(&state, get(uri)).await;
            assert_eq!(code, StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_start_twice_single_worker() {
        let state = test_state("test-pattern");

        let (_, first) = send(&state, get("/api/start-drowsiness-detection")).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["message"], "Drowsiness detection started");

        let (_, second) = send(&state, get("/api/start-drowsiness-detection")).await;
        assert_eq!(second["success"], true);
        assert_eq!(state.scheduler.active_workers(), 1);
        assert!(state.mailbox.peek().is_some());

        let (_, status) = send(&state, get("/api/status")).await;
        assert_eq!(status["is_processing"], true);

        let (_, stopped) = send(&state, get("/api/stop-drowsiness-detection")).await;
        assert_eq!(stopped["success"], true);
        assert_eq!(stopped["message"], "Drowsiness detection stopped");
        assert!(!state.camera.is_open());
        assert!(state.mailbox.peek().is_none());
    }

    #[tokio::test]
    async fn test_start_with_missing_camera() {
        let state = test_state("/nonexistent/video0");
        let (code, body) = send(&state, get("/api/start-drowsiness-detection")).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Failed to initialize camera");
        assert_eq!(state.scheduler.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_video_feed_serves_placeholder() {
        let state = test_state("test-pattern");
        let response = create_router(Arc::clone(&state))
            .oneshot(get("/video_feed"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "multipart/x-mixed-replace; boundary=frame"
        );

        let mut parts = response.into_body().into_data_stream();
        let first = parts.next().await.unwrap().unwrap();
        let expected = stream_renderer::multipart_part(state.renderer.placeholder());
        assert_eq!(first, expected);
    }

    #[tokio::test]
    async fn test_sos_and_alert_history() {
        let state = test_state("test-pattern");

        let (code, body) = send(&state, post_json("/api/trigger-sos", json!({}))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "SOS Alert triggered");

        send(&state, post_json("/api/trigger-sos", json!({ "reason": "chest pain" }))).await;

        let (_, history) = send(&state, get("/api/alert-history")).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["alert_type"], "sos");
        assert_eq!(history[0]["message"], "SOS Alert triggered: chest pain");
        assert_eq!(history[1]["message"], "SOS Alert triggered: Manual trigger");

        let (_, limited) = send(&state, get("/api/alert-history?limit=1")).await;
        assert_eq!(limited.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_music_endpoints() {
        let state = test_state("test-pattern");

        let (code, body) = send(&state, post_json("/api/music/play", json!({}))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No mood specified");

        let (code, body) = send(&state, post_json("/api/music/play", json!({ "mood": "happy" }))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["message"], "Playing music for mood: happy");

        let (_, current) = send(&state, get("/api/music/current")).await;
        assert_eq!(current["is_playing"], true);
        assert_eq!(current["mood"], "happy");

        let (_, stopped) = send(&state, post_json("/api/music/stop", json!({}))).await;
        assert_eq!(stopped["message"], "Music stopped");
        assert!(!state.music.current().is_playing);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let state = test_state("test-pattern");
        let response = create_router(state).oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
