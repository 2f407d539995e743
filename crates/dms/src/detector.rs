//! Baseline analyzers
//!
//! Lightweight image-statistics analyzers used when no trained models are
//! configured. They work on fixed face-region heuristics (the driver is
//! assumed centred in a cabin camera) and make no accuracy claims.

use camera_capture::frame::luminance;
use camera_capture::VideoFrame;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::pulse::PulseSpectrum;
use crate::reading::{
    CounterUpdate, DetectorResult, DrowsinessReading, Emotion, EmotionReading, HeadPose,
    HeartRateReading, HeartRateStatus, PhoneReading,
};
use crate::state::EyeTracker;
use crate::{Detector, DetectorError, DetectorKind, DmsConfig};

/// Luma under which a pixel counts as dark
const DARK_LUMA: u8 = 40;

/// Scales eye-band contrast into the usual EAR range
const EAR_SCALE: f32 = 0.35;

/// Maximum head angle reported by the brightness-asymmetry estimate (degrees)
const MAX_POSE_DEGREES: f32 = 45.0;

/// Rectangle in frame-relative coordinates (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Region {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Pixel bounds `(x0, y0, x1, y1)`, end-exclusive
    fn bounds(&self, frame: &VideoFrame) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (frame.width as f32, frame.height as f32);
        let x0 = (self.left * w).round() as u32;
        let y0 = (self.top * h).round() as u32;
        let x1 = ((self.right * w).round() as u32).min(frame.width);
        let y1 = ((self.bottom * h).round() as u32).min(frame.height);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

/// Face bounding box assumed for a centred driver
pub const FACE: Region = Region::new(0.3, 0.2, 0.7, 0.7);
pub const EYES: Region = Region::new(0.3, 0.3, 0.7, 0.4);
pub const MOUTH: Region = Region::new(0.3, 0.55, 0.7, 0.65);
const FACE_LEFT: Region = Region::new(0.3, 0.2, 0.5, 0.7);
const FACE_RIGHT: Region = Region::new(0.5, 0.2, 0.7, 0.7);
const FACE_UPPER: Region = Region::new(0.3, 0.2, 0.7, 0.45);
const FACE_LOWER: Region = Region::new(0.3, 0.45, 0.7, 0.7);
/// Where a handheld phone shows up beside the face
const PHONE_LEFT: Region = Region::new(0.0, 0.4, 0.25, 1.0);
const PHONE_RIGHT: Region = Region::new(0.75, 0.4, 1.0, 1.0);

/// Pixel statistics of a region
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionStats {
    pub mean_luma: f32,
    pub std_dev: f32,
    pub mean_green: f32,
    pub dark_ratio: f32,
}

/// Compute statistics for a region; `None` if the region has no pixels
pub fn region_stats(frame: &VideoFrame, region: Region) -> Option<RegionStats> {
    let (x0, y0, x1, y1) = region.bounds(frame)?;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut green = 0.0f64;
    let mut dark = 0usize;
    let mut count = 0usize;

    for y in y0..y1 {
        for x in x0..x1 {
            let [r, g, b] = frame.get_pixel(x, y)?;
            let l = luminance(r, g, b);
            sum += l as f64;
            sum_sq += (l as f64) * (l as f64);
            green += g as f64;
            if l < DARK_LUMA {
                dark += 1;
            }
            count += 1;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    Some(RegionStats {
        mean_luma: mean as f32,
        std_dev: variance.sqrt() as f32,
        mean_green: (green / n) as f32,
        dark_ratio: (dark as f64 / n) as f32,
    })
}

fn ensure_valid(frame: &VideoFrame) -> Result<(), DetectorError> {
    if frame.is_valid() {
        Ok(())
    } else {
        Err(DetectorError::InvalidFrame(format!(
            "{}x{}x{} with {} bytes",
            frame.width,
            frame.height,
            frame.channels,
            frame.data.len()
        )))
    }
}

fn stats(frame: &VideoFrame, region: Region) -> Result<RegionStats, DetectorError> {
    region_stats(frame, region)
        .ok_or_else(|| DetectorError::InvalidFrame("frame too small for face region".into()))
}

/// Face statistics if the face region has enough structure to hold a face
fn visible_face(frame: &VideoFrame, config: &DmsConfig) -> Result<Option<RegionStats>, DetectorError> {
    ensure_valid(frame)?;
    let face = stats(frame, FACE)?;
    Ok((face.std_dev >= config.face_contrast_threshold).then_some(face))
}

fn asymmetry(a: f32, b: f32) -> f32 {
    (a - b) / (a + b).max(1.0)
}

/// Eye openness, blink/yawn counting and head pose
pub struct EyeStateAnalyzer {
    config: DmsConfig,
    tracker: EyeTracker,
}

impl EyeStateAnalyzer {
    pub fn new(config: &DmsConfig) -> Self {
        info!(
            "Eye state analyzer: EAR threshold {}, drowsy after {} frames",
            config.ear_threshold,
            config.drowsy_frames()
        );
        Self {
            config: config.clone(),
            tracker: EyeTracker::default(),
        }
    }
}

impl Detector for EyeStateAnalyzer {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Drowsiness
    }

    fn analyze(&mut self, frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
        let Some(face) = visible_face(frame, &self.config)? else {
            if self.tracker.face_absent_frames == 0 {
                debug!("Face lost");
            }
            self.tracker.face_lost();
            return Ok(Some(DetectorResult::Drowsiness(DrowsinessReading {
                face_detected: Some(false),
                ..Default::default()
            })));
        };

        let eyes = stats(frame, EYES)?;
        let mouth = stats(frame, MOUTH)?;

        let ear = (eyes.std_dev / face.std_dev * EAR_SCALE).clamp(0.0, 0.5);
        let mouth_open = mouth.mean_luma < face.mean_luma * self.config.yawn_darkness_ratio;
        let events = self.tracker.update(
            ear < self.config.ear_threshold,
            mouth_open,
            self.config.drowsy_frames(),
            self.config.yawn_min_frames,
        );

        let head_pose = HeadPose {
            x: asymmetry(stats(frame, FACE_UPPER)?.mean_luma, stats(frame, FACE_LOWER)?.mean_luma)
                * MAX_POSE_DEGREES,
            y: asymmetry(stats(frame, FACE_LEFT)?.mean_luma, stats(frame, FACE_RIGHT)?.mean_luma)
                * MAX_POSE_DEGREES,
            z: 0.0,
        };

        Ok(Some(DetectorResult::Drowsiness(DrowsinessReading {
            ear: Some(ear),
            is_drowsy: Some(events.drowsy),
            blinks: Some(CounterUpdate::Delta(u32::from(events.blink))),
            yawns: Some(CounterUpdate::Delta(u32::from(events.yawn))),
            head_pose: Some(head_pose),
            face_detected: Some(true),
        })))
    }
}

/// Brightness-based expression classifier (neutral unless the mouth region
/// is markedly brighter than the face, as with a broad smile)
pub struct EmotionClassifier {
    config: DmsConfig,
}

impl EmotionClassifier {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Detector for EmotionClassifier {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Emotion
    }

    fn analyze(&mut self, frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
        let Some(face) = visible_face(frame, &self.config)? else {
            return Ok(None);
        };
        let mouth = stats(frame, MOUTH)?;

        let brightness = mouth.mean_luma / face.mean_luma.max(1.0);
        let reading = if brightness > 1.15 {
            EmotionReading {
                label: Emotion::Happy,
                confidence: ((brightness - 1.0) * 2.0).clamp(0.0, 1.0),
            }
        } else {
            EmotionReading {
                label: Emotion::Neutral,
                confidence: (face.std_dev / 64.0).clamp(0.0, 1.0),
            }
        };

        Ok(Some(DetectorResult::Emotion(reading)))
    }
}

/// Dark-object heuristic beside the face
pub struct PhoneDetector {
    config: DmsConfig,
}

impl PhoneDetector {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Detector for PhoneDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Phone
    }

    fn analyze(&mut self, frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
        if visible_face(frame, &self.config)?.is_none() {
            return Ok(Some(DetectorResult::Phone(PhoneReading::default())));
        }

        let ratio = stats(frame, PHONE_LEFT)?
            .dark_ratio
            .max(stats(frame, PHONE_RIGHT)?.dark_ratio);

        Ok(Some(DetectorResult::Phone(PhoneReading {
            is_detected: ratio >= self.config.phone_dark_ratio,
            confidence: ratio,
        })))
    }
}

/// Remote photoplethysmography: pulse from the face's mean green level
pub struct HeartRateMonitor {
    window: usize,
    samples: VecDeque<f64>,
    spectrum: PulseSpectrum,
    config: DmsConfig,
}

impl HeartRateMonitor {
    pub fn new(config: &DmsConfig) -> Self {
        let window = config.heart_rate_window.max(8);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            spectrum: PulseSpectrum::new(config.sample_rate_hz(), config.pulse_band_hz),
            config: config.clone(),
        }
    }

    /// Samples collected toward the next estimate
    pub fn buffered(&self) -> usize {
        self.samples.len()
    }
}

impl Detector for HeartRateMonitor {
    fn kind(&self) -> DetectorKind {
        DetectorKind::HeartRate
    }

    fn analyze(&mut self, frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
        let Some(face) = visible_face(frame, &self.config)? else {
            // The signal is only meaningful while the face stays in view
            self.samples.clear();
            return Ok(None);
        };

        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(face.mean_green as f64);
        if self.samples.len() < self.window {
            return Ok(None);
        }

        let signal: Vec<f64> = self.samples.iter().copied().collect();
        Ok(self.spectrum.dominant(&signal).map(|peak| {
            let bpm = peak.bpm();
            DetectorResult::HeartRate(HeartRateReading {
                bpm,
                status: HeartRateStatus::from_bpm(bpm),
            })
        }))
    }
}
