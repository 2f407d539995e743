//! Detector fan-out with per-detector failure isolation

use camera_capture::VideoFrame;
use dms::{Detector, DetectorError, DetectorKind, DetectorResult, DmsConfig};
use fusion::AggregationStore;
use metrics::counter;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info, trace};

/// Outcome of one pipeline pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Results written to the store
    pub applied: usize,
    /// Detectors with nothing to report this frame
    pub absent: usize,
    /// Detectors that failed this frame
    pub failed: Vec<DetectorKind>,
}

/// Fixed, ordered set of detectors run against one frame per tick
pub struct DetectorPipeline {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorPipeline {
    /// Build a pipeline; detectors run in `DetectorKind` order
    pub fn new(mut detectors: Vec<Box<dyn Detector>>) -> Self {
        detectors.sort_by_key(|d| d.kind());
        info!(
            "Detector pipeline: [{}]",
            detectors
                .iter()
                .map(|d| d.kind().as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self { detectors }
    }

    /// Pipeline with the baseline analyzers
    pub fn standard(config: &DmsConfig) -> Self {
        Self::new(dms::standard_detectors(config))
    }

    pub fn kinds(&self) -> Vec<DetectorKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector on the same frame and apply what they report.
    ///
    /// A failing or panicking detector only loses its own result for this
    /// frame; the remaining detectors still run.
    pub fn run_into(&mut self, frame: &VideoFrame, store: &AggregationStore) -> TickReport {
        let mut report = TickReport::default();

        for detector in self.detectors.iter_mut() {
            let kind = detector.kind();
            match run_guarded(detector.as_mut(), frame) {
                Ok(Some(result)) => {
                    store.apply(&result);
                    report.applied += 1;
                }
                Ok(None) => {
                    trace!("{}: no result", kind.as_str());
                    report.absent += 1;
                }
                Err(e) => {
                    error!("Error in {}: {}", kind.component_name(), e);
                    counter!("detector_failures_total", "detector" => kind.as_str()).increment(1);
                    report.failed.push(kind);
                }
            }
        }

        report
    }
}

fn run_guarded(
    detector: &mut dyn Detector,
    frame: &VideoFrame,
) -> Result<Option<DetectorResult>, DetectorError> {
    panic::catch_unwind(AssertUnwindSafe(|| detector.analyze(frame)))
        .unwrap_or_else(|payload| Err(DetectorError::Panicked(panic_message(&*payload))))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dms::{
        CounterUpdate, DrowsinessReading, Emotion, EmotionReading, HeartRateReading,
        HeartRateStatus, PhoneReading,
    };

    /// Detector returning the same result every frame
    pub(crate) struct Fixed(pub DetectorResult);

    impl Detector for Fixed {
        fn kind(&self) -> DetectorKind {
            match self.0 {
                DetectorResult::Drowsiness(_) => DetectorKind::Drowsiness,
                DetectorResult::Emotion(_) => DetectorKind::Emotion,
                DetectorResult::Phone(_) => DetectorKind::Phone,
                DetectorResult::HeartRate(_) => DetectorKind::HeartRate,
            }
        }

        fn analyze(&mut self, _frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
            Ok(Some(self.0.clone()))
        }
    }

    pub(crate) struct Failing(pub DetectorKind);

    impl Detector for Failing {
        fn kind(&self) -> DetectorKind {
            self.0
        }

        fn analyze(&mut self, _frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
            Err(DetectorError::Inference("model unavailable".into()))
        }
    }

    struct Panicking;

    impl Detector for Panicking {
        fn kind(&self) -> DetectorKind {
            DetectorKind::Emotion
        }

        fn analyze(&mut self, _frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
            panic!("landmark index out of range")
        }
    }

    struct Silent(DetectorKind);

    impl Detector for Silent {
        fn kind(&self) -> DetectorKind {
            self.0
        }

        fn analyze(&mut self, _frame: &VideoFrame) -> Result<Option<DetectorResult>, DetectorError> {
            Ok(None)
        }
    }

    pub(crate) fn blink_drowsy() -> DetectorResult {
        DetectorResult::Drowsiness(DrowsinessReading {
            ear: Some(0.2),
            is_drowsy: Some(true),
            blinks: Some(CounterUpdate::Delta(1)),
            face_detected: Some(true),
            ..Default::default()
        })
    }

    pub(crate) fn sad() -> DetectorResult {
        DetectorResult::Emotion(EmotionReading {
            label: Emotion::Sad,
            confidence: 0.7,
        })
    }

    pub(crate) fn phone() -> DetectorResult {
        DetectorResult::Phone(PhoneReading {
            is_detected: true,
            confidence: 0.9,
        })
    }

    pub(crate) fn pulse() -> DetectorResult {
        DetectorResult::HeartRate(HeartRateReading {
            bpm: 72,
            status: HeartRateStatus::Normal,
        })
    }

    pub(crate) fn frame() -> VideoFrame {
        VideoFrame::new(vec![0; 4 * 4 * 3], 4, 4, 0, 0)
    }

    #[test]
    fn test_runs_in_kind_order() {
        let pipeline = DetectorPipeline::new(vec![
            Box::new(Fixed(pulse())),
            Box::new(Fixed(phone())),
            Box::new(Fixed(blink_drowsy())),
            Box::new(Fixed(sad())),
        ]);
        assert_eq!(pipeline.kinds(), DetectorKind::ALL.to_vec());
        assert_eq!(pipeline.len(), 4);
    }

    #[test]
    fn test_failure_isolated_to_one_detector() {
        let store = AggregationStore::new();
        let mut pipeline = DetectorPipeline::new(vec![
            Box::new(Fixed(blink_drowsy())),
            Box::new(Panicking),
            Box::new(Failing(DetectorKind::Phone)),
            Box::new(Fixed(pulse())),
        ]);

        let report = pipeline.run_into(&frame(), &store);
        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, vec![DetectorKind::Emotion, DetectorKind::Phone]);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.drowsiness.blink_count, 1);
        assert_eq!(snapshot.heart_rate.bpm, 72);
        assert!(snapshot.emotion.emotion_history.is_empty());
        assert!(snapshot.phone.last_detected.is_none());
    }

    #[test]
    fn test_absent_result_leaves_fields() {
        let store = AggregationStore::new();
        DetectorPipeline::new(vec![Box::new(Fixed(sad()))]).run_into(&frame(), &store);

        let mut pipeline = DetectorPipeline::new(vec![Box::new(Silent(DetectorKind::Emotion))]);
        let report = pipeline.run_into(&frame(), &store);

        assert_eq!(report.absent, 1);
        assert_eq!(store.emotion().current_emotion, Emotion::Sad);
        assert_eq!(store.emotion().emotion_history.len(), 1);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
