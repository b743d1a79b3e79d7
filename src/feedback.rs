//! Haptic and audio cues
//!
//! Engines fire cues and forget about them. The host supplies the sink that
//! turns a cue into a sound or a vibration.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Semantic feedback events raised by the engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    /// Correct tile tapped
    Tap,
    /// A round inside a level was cleared
    RoundComplete,
    /// Wrong input
    Error,
    /// Normal orb caught
    OrbCaught,
    /// Golden orb caught
    GoldenCaught,
    /// Danger orb tapped
    DangerHit,
    /// Power-up activated
    PowerUp,
    /// Tap that landed outside any window
    Miss,
    /// Collectible picked up
    Collect,
    /// Teleported through a portal
    Portal,
    /// Gravity direction changed
    GravityShift,
    /// Orb hit a wall or obstacle hard enough to notice
    Bounce,
    /// Perfectly timed tap
    Perfect,
    /// Well timed tap
    Good,
    /// Level cleared
    LevelComplete,
    /// Level lost
    LevelFailed,
}

impl Cue {
    /// Whether the cue also has a vibration pattern
    pub fn has_haptic(&self) -> bool {
        !matches!(self, Cue::Bounce | Cue::Miss | Cue::Portal)
    }
}

/// Receiver for cues (device audio, haptics engine, test recorder)
pub trait FeedbackSink: Send {
    /// Play the sound for a cue
    fn sound(&mut self, _cue: Cue) {}

    /// Fire the vibration for a cue
    fn haptic(&mut self, _cue: Cue) {}
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FeedbackSink for NullSink {}

/// Sink that logs each cue (handy for headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl FeedbackSink for LogSink {
    fn sound(&mut self, cue: Cue) {
        log::debug!("sound: {:?}", cue);
    }

    fn haptic(&mut self, cue: Cue) {
        log::debug!("haptic: {:?}", cue);
    }
}

/// Sink that records sound cues into a shared list
///
/// Clones share the same list, so a test can keep one clone and hand the
/// other to an engine.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    sounds: Arc<Mutex<Vec<Cue>>>,
    haptics: Arc<Mutex<Vec<Cue>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sound cues received so far
    pub fn cues(&self) -> Vec<Cue> {
        self.sounds.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Haptic cues received so far
    pub fn haptics(&self) -> Vec<Cue> {
        self.haptics.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.cues().iter().filter(|c| **c == cue).count()
    }

    pub fn clear(&self) {
        if let Ok(mut v) = self.sounds.lock() {
            v.clear();
        }
        if let Ok(mut v) = self.haptics.lock() {
            v.clear();
        }
    }
}

impl FeedbackSink for RecordingSink {
    fn sound(&mut self, cue: Cue) {
        if let Ok(mut v) = self.sounds.lock() {
            v.push(cue);
        }
    }

    fn haptic(&mut self, cue: Cue) {
        if let Ok(mut v) = self.haptics.lock() {
            v.push(cue);
        }
    }
}

/// Settings-aware front for a sink, owned by one engine
pub struct Feedback {
    sink: Box<dyn FeedbackSink>,
    settings: Settings,
}

impl Default for Feedback {
    fn default() -> Self {
        Self::new(NullSink)
    }
}

impl std::fmt::Debug for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feedback")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Feedback {
    pub fn new(sink: impl FeedbackSink + 'static) -> Self {
        Self::with_settings(sink, Settings::default())
    }

    pub fn with_settings(sink: impl FeedbackSink + 'static, settings: Settings) -> Self {
        Self {
            sink: Box::new(sink),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Route a cue to the enabled channels
    pub fn emit(&mut self, cue: Cue) {
        log::trace!("cue {:?}", cue);
        if self.settings.effective_sound() {
            self.sink.sound(cue);
        }
        if self.settings.haptics_enabled && cue.has_haptic() {
            self.sink.haptic(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_both_channels() {
        let sink = RecordingSink::new();
        let mut feedback = Feedback::new(sink.clone());
        feedback.emit(Cue::Tap);
        feedback.emit(Cue::Bounce);
        assert_eq!(sink.cues(), vec![Cue::Tap, Cue::Bounce]);
        // Bounce has no vibration pattern
        assert_eq!(sink.haptics(), vec![Cue::Tap]);
    }

    #[test]
    fn test_settings_gate_channels() {
        let sink = RecordingSink::new();
        let mut settings = Settings::default();
        settings.sound_enabled = false;
        let mut feedback = Feedback::with_settings(sink.clone(), settings);
        feedback.emit(Cue::Error);
        assert!(sink.cues().is_empty());
        assert_eq!(sink.haptics(), vec![Cue::Error]);

        feedback.set_settings(Settings::silent());
        feedback.emit(Cue::Error);
        assert_eq!(sink.haptics().len(), 1);
    }

    #[test]
    fn test_recording_sink_count_and_clear() {
        let sink = RecordingSink::new();
        let mut feedback = Feedback::new(sink.clone());
        feedback.emit(Cue::Collect);
        feedback.emit(Cue::Collect);
        assert_eq!(sink.count(Cue::Collect), 2);
        sink.clear();
        assert_eq!(sink.count(Cue::Collect), 0);
    }
}
