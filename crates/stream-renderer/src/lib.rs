//! Stream Renderer
//!
//! Turns the latest mailbox frame plus the current driver status into an
//! MJPEG (`multipart/x-mixed-replace`) stream. Each viewer gets its own
//! paced stream; missing frames and encode failures fall back to a
//! placeholder image, never to a dropped connection.

pub mod font;
pub mod overlay;
pub mod placeholder;
pub mod renderer;

pub use renderer::{
    multipart_part, PartKind, RendererConfig, StreamRenderer, BOUNDARY, STREAM_CONTENT_TYPE,
};

use thiserror::Error;

/// Rendering error types
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}
