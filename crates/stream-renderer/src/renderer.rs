//! Paced MJPEG stream of the latest frame

use bytes::Bytes;
use camera_capture::VideoFrame;
use frame_mailbox::FrameMailbox;
use fusion::AggregationStore;
use futures::{Stream, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tracing::{error, warn};

use crate::overlay::render_frame;

/// Multipart boundary between stream parts
pub const BOUNDARY: &str = "frame";

/// Content type of the stream response
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Parts per second per viewer
    pub fps: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            jpeg_quality: 80,
        }
    }
}

impl RendererConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.clamp(1, 1000)))
    }
}

/// What a stream part carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Frame,
    Placeholder,
}

impl PartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Frame => "frame",
            PartKind::Placeholder => "placeholder",
        }
    }
}

/// Wrap one JPEG as a multipart part
pub fn multipart_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        jpeg.len()
    );
    let mut data = Vec::with_capacity(header.len() + jpeg.len() + 2);
    data.extend_from_slice(header.as_bytes());
    data.extend_from_slice(jpeg);
    data.extend_from_slice(b"\r\n");
    Bytes::from(data)
}

/// Renders the mailbox frame with the current status overlay
pub struct StreamRenderer {
    mailbox: Arc<FrameMailbox<VideoFrame>>,
    store: Arc<AggregationStore>,
    placeholder: Bytes,
    config: RendererConfig,
}

impl StreamRenderer {
    pub fn new(
        config: RendererConfig,
        mailbox: Arc<FrameMailbox<VideoFrame>>,
        store: Arc<AggregationStore>,
        placeholder: Bytes,
    ) -> Self {
        Self {
            mailbox,
            store,
            placeholder,
            config,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn placeholder(&self) -> &Bytes {
        &self.placeholder
    }

    /// Produce one JPEG. Never fails: anything that goes wrong yields the
    /// placeholder.
    pub fn render_tick(&self) -> (PartKind, Bytes) {
        let Some(frame) = self.mailbox.peek() else {
            return (PartKind::Placeholder, self.placeholder.clone());
        };
        let status = self.store.drowsiness();

        match render_frame(&frame, &status, self.config.jpeg_quality) {
            Ok(jpeg) => (PartKind::Frame, jpeg),
            Err(e) => {
                warn!("Error generating frame: {}", e);
                (PartKind::Placeholder, self.placeholder.clone())
            }
        }
    }

    /// Endless multipart stream for one viewer, paced at the configured fps.
    ///
    /// Dropping the stream (viewer disconnect) ends it.
    pub fn stream(self: Arc<Self>) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let mut ticker = interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        IntervalStream::new(ticker).then(move |_| {
            let renderer = Arc::clone(&self);
            async move {
                let placeholder = renderer.placeholder.clone();
                let (kind, jpeg) =
                    match tokio::task::spawn_blocking(move || renderer.render_tick()).await {
                        Ok(part) => part,
                        Err(e) => {
                            error!("Render task failed: {}", e);
                            (PartKind::Placeholder, placeholder)
                        }
                    };
                counter!("stream_frames_total", "kind" => kind.as_str()).increment(1);
                Ok::<_, Infallible>(multipart_part(&jpeg))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder;
    use dms::DrowsinessReading;

    fn renderer(fps: u32) -> (Arc<StreamRenderer>, Arc<FrameMailbox<VideoFrame>>, Arc<AggregationStore>) {
        let mailbox = Arc::new(FrameMailbox::new());
        let store = Arc::new(AggregationStore::new());
        let renderer = StreamRenderer::new(
            RendererConfig {
                fps,
                jpeg_quality: 80,
            },
            Arc::clone(&mailbox),
            Arc::clone(&store),
            placeholder::generate(80).unwrap(),
        );
        (Arc::new(renderer), mailbox, store)
    }

    fn gray_frame() -> VideoFrame {
        VideoFrame::new(vec![100; 160 * 120 * 3], 160, 120, 0, 1)
    }

    #[test]
    fn test_multipart_part_layout() {
        let part = multipart_part(b"JPEG");
        assert_eq!(
            &part[..],
            b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\n\r\nJPEG\r\n"
        );
    }

    #[test]
    fn test_empty_mailbox_renders_placeholder() {
        let (renderer, _, _) = renderer(30);
        let (kind, jpeg) = renderer.render_tick();
        assert_eq!(kind, PartKind::Placeholder);
        assert_eq!(&jpeg, renderer.placeholder());
    }

    #[test]
    fn test_frame_rendered_with_overlay() {
        let (renderer, mailbox, store) = renderer(30);
        store.apply_drowsiness(&DrowsinessReading {
            is_drowsy: Some(true),
            ..Default::default()
        });
        mailbox.put(gray_frame());

        let (kind, jpeg) = renderer.render_tick();
        assert_eq!(kind, PartKind::Frame);
        assert_ne!(&jpeg, renderer.placeholder());
        let decoded = VideoFrame::decode(&jpeg).unwrap();
        assert_eq!((decoded.width, decoded.height), (160, 120));
    }

    #[test]
    fn test_broken_frame_degrades_to_placeholder() {
        let (renderer, mailbox, _) = renderer(30);
        mailbox.put(VideoFrame::new(vec![1, 2, 3], 160, 120, 0, 0));
        let (kind, jpeg) = renderer.render_tick();
        assert_eq!(kind, PartKind::Placeholder);
        assert_eq!(&jpeg, renderer.placeholder());
    }

    #[tokio::test]
    async fn test_stream_keeps_emitting_placeholder() {
        let (renderer, _, _) = renderer(200);
        let expected = multipart_part(renderer.placeholder());

        let parts: Vec<_> = Arc::clone(&renderer).stream().take(5).collect().await;
        assert_eq!(parts.len(), 5);
        for part in parts {
            assert_eq!(part.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_stream_switches_to_frames() {
        let (renderer, mailbox, _) = renderer(200);
        let mut stream = Box::pin(Arc::clone(&renderer).stream());

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, multipart_part(renderer.placeholder()));

        mailbox.put(gray_frame());
        let second = stream.next().await.unwrap().unwrap();
        assert_ne!(second, first);
        assert!(second.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n"));

        mailbox.clear();
        let third = stream.next().await.unwrap().unwrap();
        assert_eq!(third, first);
    }
}
