//! Deterministic simulation module
//!
//! One engine per mini-game. Engines are pure simulation:
//! - Host drives time through `update(dt)` at a fixed rate
//! - Seeded RNG only
//! - Input outside `Playing` is ignored, never an error
//! - No rendering or platform dependencies

pub mod collision;
pub mod gravity;
pub mod lanes;
pub mod maze;
pub mod rhythm;
pub mod sequence;
pub mod session;
pub mod timers;

pub use collision::{CollisionResult, Rect, circle_rect_collision, clamp_to_arena};
pub use gravity::{GravityDirection, GravityGame, GravityState, Obstacle, ObstacleKind, Portal};
pub use lanes::{LaneGame, LaneObject, LaneState, ObjectKind, PowerUpKind};
pub use maze::{Cell, MazeGame, MazeState};
pub use rhythm::{Grade, NodeKind, RhythmGame, RhythmState, TimingNode};
pub use sequence::{SequenceGame, SequenceState};
pub use session::{CompletionFn, Session};
pub use timers::{TimerHandle, Timers};

use serde::{Deserialize, Serialize};

use crate::GameId;

/// Phase of a level attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayState {
    /// Waiting to begin (initial, and between rounds)
    #[default]
    Ready,
    /// Playing back something the player must memorize
    Showing,
    /// Accepting input
    Playing,
    /// Round or level cleared
    Success,
    /// Level lost
    Failed,
}

impl PlayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayState::Success | PlayState::Failed)
    }
}

/// Result of one level attempt, handed to the completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub score: u32,
    /// Star rating, always 1..=3
    pub stars: u8,
    /// Level cleared (false for a failed attempt)
    pub won: bool,
}

impl Outcome {
    pub fn new(score: u32, stars: u8, won: bool) -> Self {
        Self {
            score,
            stars: stars.clamp(1, 3),
            won,
        }
    }
}

/// Common surface of every engine, for hosts that handle games generically
pub trait MiniGame: Send {
    fn game(&self) -> GameId;

    /// Level of the current (or last) attempt
    fn level(&self) -> u32;

    /// Reset everything and begin an attempt at `level`
    fn start(&mut self, level: u32);

    /// Advance simulated time by `dt` seconds
    fn update(&mut self, dt: f32);

    fn phase(&self) -> PlayState;

    fn score(&self) -> u32;

    /// Set once the attempt is over
    fn outcome(&self) -> Option<Outcome>;

    /// Receive the outcome once per attempt, shortly after it ends
    fn set_on_complete(&mut self, callback: CompletionFn);

    /// Stop ticking and cancel everything pending
    fn teardown(&mut self);
}
