//! In-memory music player boundary
//!
//! Tracks what the dashboard asked to play. Audio output is handled
//! elsewhere.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// What the player is doing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MusicInfo {
    pub is_playing: bool,
    pub mood: Option<String>,
    pub track: Option<String>,
}

/// Mood-driven playlist selection
#[derive(Default)]
pub struct MusicPlayer {
    current: Mutex<MusicInfo>,
}

fn playlist_for(mood: &str) -> &'static str {
    match mood {
        "happy" => "Upbeat Drive",
        "sad" => "Gentle Lift",
        "angry" | "disgust" => "Slow Breathing",
        "fear" | "surprise" => "Calm Focus",
        "drowsy" | "tired" => "Wake Up Mix",
        _ => "Road Trip Mix",
    }
}

impl MusicPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_for_mood(&self, mood: &str) -> MusicInfo {
        let mood = mood.trim().to_lowercase();
        let track = playlist_for(&mood);
        info!("Playing '{}' for mood {}", track, mood);

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = MusicInfo {
            is_playing: true,
            mood: Some(mood),
            track: Some(track.to_string()),
        };
        current.clone()
    }

    pub fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_playing {
            info!("Music stopped");
        }
        *current = MusicInfo::default();
    }

    pub fn current(&self) -> MusicInfo {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_and_stop() {
        let player = MusicPlayer::new();
        assert!(!player.current().is_playing);

        let info = player.play_for_mood("Happy");
        assert!(info.is_playing);
        assert_eq!(info.mood.as_deref(), Some("happy"));
        assert_eq!(info.track.as_deref(), Some("Upbeat Drive"));
        assert_eq!(player.current(), info);

        player.stop();
        assert_eq!(player.current(), MusicInfo::default());
    }

    #[test]
    fn test_unknown_mood_gets_default_playlist() {
        let player = MusicPlayer::new();
        assert_eq!(
            player.play_for_mood("contemplative").track.as_deref(),
            Some("Road Trip Mix")
        );
    }
}
