//! Player preferences
//!
//! Stored by the host next to the progress book. Gates which feedback
//! channels reach the sink.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Play sound cues
    pub sound_enabled: bool,
    /// Fire haptic cues
    pub haptics_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            haptics_enabled: true,
            master_volume: 0.8,
        }
    }
}

impl Settings {
    /// Settings with every feedback channel off
    pub fn silent() -> Self {
        Self {
            sound_enabled: false,
            haptics_enabled: false,
            ..Self::default()
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Whether sound cues should reach the sink
    pub fn effective_sound(&self) -> bool {
        self.sound_enabled && self.master_volume > 0.0
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.master_volume = settings.master_volume.clamp(0.0, 1.0);
        log::info!("Loaded settings");
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
