//! Driver eye/mouth state tracked across frames

use std::collections::VecDeque;

/// Eye-openness samples kept for PERCLOS (~1 minute at 10 fps)
const PERCLOS_WINDOW: usize = 600;

/// PERCLOS above which the driver counts as drowsy
const PERCLOS_DROWSY: f32 = 0.5;

/// Events produced by one state update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEvents {
    pub blink: bool,
    pub yawn: bool,
    pub drowsy: bool,
}

/// Driver state (tracked over time)
#[derive(Debug, Clone, Default)]
pub struct EyeTracker {
    /// Frames where face was not detected
    pub face_absent_frames: u32,

    /// Consecutive frames with eyes closed
    pub closed_frames: u32,

    /// Consecutive frames with mouth open
    pub mouth_open_frames: u32,

    /// Closed/open history (for PERCLOS)
    closed_history: VecDeque<bool>,
}

impl EyeTracker {
    /// Calculate PERCLOS (Percentage of Eye Closure)
    pub fn perclos(&self) -> f32 {
        if self.closed_history.is_empty() {
            return 0.0;
        }
        let closed = self.closed_history.iter().filter(|&&c| c).count();
        closed as f32 / self.closed_history.len() as f32
    }

    /// Record a frame without a visible face
    pub fn face_lost(&mut self) {
        self.face_absent_frames = self.face_absent_frames.saturating_add(1);
        self.closed_frames = 0;
        self.mouth_open_frames = 0;
    }

    /// Record one frame with a visible face
    pub fn update(
        &mut self,
        eyes_closed: bool,
        mouth_open: bool,
        drowsy_frames: u32,
        yawn_min_frames: u32,
    ) -> FrameEvents {
        let mut events = FrameEvents::default();
        self.face_absent_frames = 0;

        if eyes_closed {
            self.closed_frames = self.closed_frames.saturating_add(1);
        } else {
            // A short closure that reopened is a blink; a long one was a microsleep
            events.blink = self.closed_frames > 0 && self.closed_frames < drowsy_frames;
            self.closed_frames = 0;
        }

        if mouth_open {
            self.mouth_open_frames = self.mouth_open_frames.saturating_add(1);
        } else {
            events.yawn = self.mouth_open_frames >= yawn_min_frames;
            self.mouth_open_frames = 0;
        }

        self.closed_history.push_back(eyes_closed);
        if self.closed_history.len() > PERCLOS_WINDOW {
            self.closed_history.pop_front();
        }

        let perclos_ready = self.closed_history.len() as u32 >= drowsy_frames.saturating_mul(2);
        events.drowsy = self.closed_frames >= drowsy_frames
            || (perclos_ready && self.perclos() > PERCLOS_DROWSY);
        events
    }
}
