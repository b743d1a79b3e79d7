//! Pocket Arcade - simulation engines for a casual mini-game collection
//!
//! Core modules:
//! - `sim`: Per-game simulation engines (state machines, generation, scoring)
//! - `tuning`: Data-driven level tables for every game
//! - `feedback`: Haptic/audio cue sink consumed by the engines
//! - `driver`: Fixed-timestep host loop helpers
//! - `progress`: Best records and level unlocks per game
//! - `settings`: Player preferences

pub mod driver;
pub mod error;
pub mod feedback;
pub mod progress;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{Error, Result};
pub use feedback::{Cue, Feedback, FeedbackSink};
pub use progress::ProgressBook;
pub use settings::Settings;
pub use sim::{MiniGame, Outcome, PlayState};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the driver will simulate in one go
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Delay between the terminal tick and the completion callback
    pub const COMPLETION_DELAY: f32 = 0.5;
    /// How long transient score/grade text stays up
    pub const FEEDBACK_TEXT_DURATION: f32 = 0.5;

    /// Number of authored levels per game
    pub const LEVEL_COUNT: u32 = 12;
}

/// Identifies one of the mini-games in the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameId {
    /// Watch a tile sequence, then repeat it
    TileMemory,
    /// Tap orbs as they cross the catch zone
    MomentumCatch,
    /// Draw a route through a generated maze
    Labyrinth,
    /// Steer an orb by flipping gravity
    GravityFlux,
    /// Tap as the sweep crosses ring nodes
    ChronoCascade,
}

impl GameId {
    pub const ALL: [GameId; 5] = [
        GameId::TileMemory,
        GameId::MomentumCatch,
        GameId::Labyrinth,
        GameId::GravityFlux,
        GameId::ChronoCascade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameId::TileMemory => "tile-memory",
            GameId::MomentumCatch => "momentum-catch",
            GameId::Labyrinth => "labyrinth",
            GameId::GravityFlux => "gravity-flux",
            GameId::ChronoCascade => "chrono-cascade",
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        GameId::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| Error::UnknownGame(s.to_string()))
    }
}

/// Clamp a level number into the authored range, mapping anything outside
/// it to level 1. Returns a zero-based table index.
#[inline]
pub fn level_index(level: u32) -> usize {
    if (1..=consts::LEVEL_COUNT).contains(&level) {
        (level - 1) as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_index_fallback() {
        assert_eq!(level_index(1), 0);
        assert_eq!(level_index(12), 11);
        assert_eq!(level_index(0), 0);
        assert_eq!(level_index(13), 0);
    }

    #[test]
    fn test_game_id_parse() {
        assert_eq!("labyrinth".parse::<GameId>().unwrap(), GameId::Labyrinth);
        assert_eq!("Gravity_Flux".parse::<GameId>().unwrap(), GameId::GravityFlux);
        assert!("pinball".parse::<GameId>().is_err());
        for game in GameId::ALL {
            assert_eq!(game.as_str().parse::<GameId>().unwrap(), game);
        }
    }
}
