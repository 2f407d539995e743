//! "No video" placeholder image

use bytes::Bytes;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::font::{draw_text, text_width};
use crate::overlay::{encode_jpeg, TEXT_SCALE};
use crate::RenderError;

pub const PLACEHOLDER_FILE: &str = "placeholder.jpg";
pub const PLACEHOLDER_WIDTH: u32 = 640;
pub const PLACEHOLDER_HEIGHT: u32 = 480;
pub const PLACEHOLDER_TEXT: &str = "NO VIDEO FEED AVAILABLE";

/// Black frame with the placeholder text centred
pub fn generate(quality: u8) -> Result<Bytes, RenderError> {
    let mut image = RgbImage::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT);
    let x = PLACEHOLDER_WIDTH.saturating_sub(text_width(PLACEHOLDER_TEXT, TEXT_SCALE)) / 2;
    draw_text(
        &mut image,
        x as i32,
        (PLACEHOLDER_HEIGHT / 2) as i32,
        PLACEHOLDER_TEXT,
        TEXT_SCALE,
        Rgb([255, 255, 255]),
    );
    encode_jpeg(&image, quality)
}

/// Read `dir/placeholder.jpg`, creating it first if it is missing.
///
/// Filesystem problems are logged and the in-memory image is used instead.
pub fn load_or_create(dir: &Path, quality: u8) -> Result<Bytes, RenderError> {
    let path = dir.join(PLACEHOLDER_FILE);

    match fs::read(&path) {
        Ok(bytes) if !bytes.is_empty() => return Ok(Bytes::from(bytes)),
        Ok(_) => warn!("Placeholder {} is empty, regenerating", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Error reading placeholder image {}: {}", path.display(), e),
    }

    let bytes = generate(quality)?;
    match fs::create_dir_all(dir).and_then(|_| fs::write(&path, &bytes)) {
        Ok(()) => info!("Created placeholder image at {}", path.display()),
        Err(e) => warn!("Could not write placeholder {}: {}", path.display(), e),
    }
    Ok(bytes)
}
