//! Status overlay and JPEG encoding

use bytes::Bytes;
use camera_capture::VideoFrame;
use fusion::DrowsinessStatus;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use crate::font::draw_text;
use crate::RenderError;

/// Font scale for overlay text
pub const TEXT_SCALE: u32 = 3;

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Draw the status lines onto `image`
pub fn draw_status(image: &mut RgbImage, status: &DrowsinessStatus) {
    let (label, color) = if status.is_drowsy {
        ("Drowsy", RED)
    } else {
        ("Alert", GREEN)
    };

    draw_text(image, 10, 30, &format!("Status: {}", label), TEXT_SCALE, color);
    draw_text(image, 10, 60, &format!("EAR: {:.2}", status.ear_value), TEXT_SCALE, GREEN);
    draw_text(image, 10, 90, &format!("Blinks: {}", status.blink_count), TEXT_SCALE, GREEN);
    draw_text(image, 10, 120, &format!("Yawns: {}", status.yawn_count), TEXT_SCALE, GREEN);
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Bytes, RenderError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(Bytes::from(buffer))
}

/// Overlay the status on a copy of `frame` and encode it
pub fn render_frame(
    frame: &VideoFrame,
    status: &DrowsinessStatus,
    quality: u8,
) -> Result<Bytes, RenderError> {
    let mut image = frame.to_rgb_image().ok_or_else(|| {
        RenderError::InvalidFrame(format!(
            "{}x{}x{} with {} bytes",
            frame.width,
            frame.height,
            frame.channels,
            frame.data.len()
        ))
    })?;
    draw_status(&mut image, status);
    encode_jpeg(&image, quality)
}
