//! Video frame types and decoding

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use image::RgbImage;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors while turning an encoded payload into a frame
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty frame payload")]
    Empty,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Standard alphabet, with or without trailing `=` padding
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded RGB video frame
///
/// Frames are immutable once captured. Components that need to keep one
/// across ticks hold it behind an `Arc` or clone it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Interleaved pixel data (width * height * channels)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Bytes per pixel
    pub channels: u8,
    /// Capture timestamp (nanoseconds since the Unix epoch)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            channels: 3,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a frame from an RGB image buffer, stamped with the current time
    pub fn from_rgb_image(image: RgbImage, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, now_ns(), sequence)
    }

    /// Decode an encoded image (JPEG, PNG, ...) into an RGB frame
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_rgb_image(img.to_rgb8(), 0))
    }

    /// Decode a base64 image payload.
    ///
    /// Accepts both bare base64 and data URLs (`data:image/jpeg;base64,...`);
    /// everything up to the first comma is treated as the prefix. Line breaks
    /// and other ASCII whitespace are ignored and padding is optional.
    pub fn decode_base64(payload: &str) -> Result<Self, DecodeError> {
        let encoded = match payload.split_once(',') {
            Some((_, rest)) => rest,
            None => payload,
        };
        let encoded: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if encoded.is_empty() {
            return Err(DecodeError::Empty);
        }

        let bytes = PAYLOAD_ENGINE.decode(encoded)?;
        Self::decode(&bytes)
    }

    /// Copy the frame into an RGB image buffer.
    ///
    /// Returns `None` if the buffer does not match the declared geometry.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Check that the buffer size matches the declared geometry
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.channels >= 3
            && self.data.len() == (self.width * self.height) as usize * self.channels as usize
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * self.channels as u32) as usize;
        self.data
            .get(idx..idx + 3)
            .map(|p| [p[0], p[1], p[2]])
    }
}

/// Luminance formula: 0.299*R + 0.587*G + 0.114*B
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (r as f32 * 0.299 + g as f32 * 0.587 + b as f32 * 0.114) as u8
}
