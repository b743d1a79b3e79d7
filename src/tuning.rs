//! Data-driven game balance
//!
//! Every game ships twelve hand-tuned levels. The tables are data, not
//! formulas: each row was adjusted by playtesting and the progression is
//! intentionally uneven in places. Level numbers outside `1..=12` resolve to
//! the level 1 row.

use serde::{Deserialize, Serialize};

use crate::level_index;

/// Tile memory tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Tiles per side (grid is `grid_size * grid_size`)
    pub grid_size: u32,
    /// Sequence length in round 1; each later round adds one tile
    pub sequence_length: u32,
    /// Rounds to clear the level
    pub rounds: u32,
    /// Seconds each tile stays lit during playback
    pub show_time: f32,
    /// Blocked tiles re-rolled every round
    pub obstacle_count: u32,
    /// Bonus tiles re-rolled every round
    pub bonus_count: u32,
}

impl SequenceConfig {
    pub fn for_level(level: u32) -> Self {
        SEQUENCE_LEVELS[level_index(level)]
    }

    pub fn tile_count(&self) -> usize {
        (self.grid_size * self.grid_size) as usize
    }
}

const fn seq(
    grid_size: u32,
    sequence_length: u32,
    rounds: u32,
    show_time: f32,
    obstacle_count: u32,
    bonus_count: u32,
) -> SequenceConfig {
    SequenceConfig {
        grid_size,
        sequence_length,
        rounds,
        show_time,
        obstacle_count,
        bonus_count,
    }
}

pub const SEQUENCE_LEVELS: [SequenceConfig; 12] = [
    seq(3, 3, 2, 0.80, 1, 1),
    seq(3, 4, 2, 0.75, 1, 1),
    seq(3, 4, 3, 0.70, 1, 1),
    seq(4, 4, 3, 0.70, 1, 1),
    seq(4, 5, 3, 0.65, 1, 1),
    seq(4, 5, 3, 0.60, 1, 2),
    seq(4, 6, 4, 0.60, 2, 2),
    seq(5, 6, 4, 0.55, 2, 2),
    seq(5, 6, 4, 0.50, 2, 2),
    seq(5, 7, 4, 0.50, 2, 2),
    seq(5, 7, 5, 0.45, 2, 2),
    seq(6, 8, 5, 0.40, 2, 2),
];

/// Momentum catch tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneConfig {
    pub lanes: u32,
    /// Horizontal speed in units/sec
    pub base_speed: f32,
    /// Seconds between spawns
    pub spawn_interval: f32,
    /// Seconds on the clock
    pub time_limit: f32,
    pub target_score: u32,
    /// Golden orbs may spawn
    pub golden: bool,
    /// Danger orbs may spawn
    pub danger: bool,
    /// Power-ups may spawn
    pub power_ups: bool,
}

impl LaneConfig {
    pub fn for_level(level: u32) -> Self {
        LANE_LEVELS[level_index(level)]
    }
}

#[allow(clippy::too_many_arguments)]
const fn lane(
    lanes: u32,
    base_speed: f32,
    spawn_interval: f32,
    time_limit: f32,
    target_score: u32,
    golden: bool,
    danger: bool,
    power_ups: bool,
) -> LaneConfig {
    LaneConfig {
        lanes,
        base_speed,
        spawn_interval,
        time_limit,
        target_score,
        golden,
        danger,
        power_ups,
    }
}

pub const LANE_LEVELS: [LaneConfig; 12] = [
    lane(3, 120.0, 1.20, 30.0, 5, false, false, false),
    lane(3, 130.0, 1.10, 30.0, 8, true, false, false),
    lane(3, 140.0, 1.00, 30.0, 10, true, false, false),
    lane(4, 150.0, 1.00, 35.0, 14, true, true, false),
    lane(4, 160.0, 0.90, 35.0, 18, true, true, true),
    lane(4, 170.0, 0.90, 40.0, 22, true, true, true),
    lane(4, 180.0, 0.80, 40.0, 26, true, true, true),
    lane(5, 190.0, 0.80, 45.0, 30, true, true, true),
    lane(5, 200.0, 0.75, 45.0, 35, true, true, true),
    lane(5, 215.0, 0.70, 50.0, 40, true, true, true),
    lane(5, 230.0, 0.65, 50.0, 46, true, true, true),
    lane(5, 250.0, 0.60, 55.0, 52, true, true, true),
];

/// Labyrinth tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MazeConfig {
    /// Cells per side
    pub grid_size: u32,
    pub time_limit: f32,
    pub collectible_count: u32,
    /// Fog of war hides cells away from the path tip
    pub fog: bool,
    /// Chebyshev radius kept visible around the path tip
    pub fog_radius: u32,
    /// Attempts to open extra cells next to the carved path
    pub extra_openings: u32,
}

impl MazeConfig {
    pub fn for_level(level: u32) -> Self {
        MAZE_LEVELS[level_index(level)]
    }
}

const fn maze(
    grid_size: u32,
    time_limit: f32,
    collectible_count: u32,
    fog: bool,
    fog_radius: u32,
    extra_openings: u32,
) -> MazeConfig {
    MazeConfig {
        grid_size,
        time_limit,
        collectible_count,
        fog,
        fog_radius,
        extra_openings,
    }
}

pub const MAZE_LEVELS: [MazeConfig; 12] = [
    maze(7, 60.0, 1, false, 2, 4),
    maze(7, 55.0, 2, false, 2, 5),
    maze(9, 60.0, 2, false, 2, 6),
    maze(9, 55.0, 3, false, 2, 7),
    maze(11, 60.0, 3, true, 3, 8),
    maze(11, 55.0, 4, true, 3, 9),
    maze(13, 65.0, 4, true, 3, 10),
    maze(13, 60.0, 5, true, 2, 11),
    maze(15, 70.0, 5, true, 2, 12),
    maze(15, 65.0, 6, true, 2, 13),
    maze(17, 75.0, 6, true, 2, 14),
    maze(17, 70.0, 7, true, 2, 15),
];

/// Gravity flux tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityConfig {
    /// Acceleration along the gravity direction, units/sec²
    pub gravity_strength: f32,
    /// Gravity changes allowed
    pub max_moves: u32,
    pub time_limit: f32,
    pub obstacle_count: u32,
    /// Some obstacles are bouncy instead of solid
    pub bounce_obstacles: bool,
    pub portal_pairs: u32,
    pub collectible_count: u32,
}

impl GravityConfig {
    pub fn for_level(level: u32) -> Self {
        GRAVITY_LEVELS[level_index(level)]
    }
}

const fn grav(
    gravity_strength: f32,
    max_moves: u32,
    time_limit: f32,
    obstacle_count: u32,
    bounce_obstacles: bool,
    portal_pairs: u32,
    collectible_count: u32,
) -> GravityConfig {
    GravityConfig {
        gravity_strength,
        max_moves,
        time_limit,
        obstacle_count,
        bounce_obstacles,
        portal_pairs,
        collectible_count,
    }
}

pub const GRAVITY_LEVELS: [GravityConfig; 12] = [
    grav(400.0, 10, 60.0, 1, false, 0, 1),
    grav(420.0, 10, 60.0, 2, false, 0, 2),
    grav(440.0, 9, 55.0, 2, true, 0, 2),
    grav(460.0, 9, 55.0, 3, true, 1, 2),
    grav(480.0, 8, 50.0, 3, true, 1, 3),
    grav(500.0, 8, 50.0, 4, true, 1, 3),
    grav(520.0, 8, 50.0, 4, true, 1, 3),
    grav(540.0, 7, 45.0, 5, true, 2, 4),
    grav(560.0, 7, 45.0, 5, true, 2, 4),
    grav(580.0, 7, 45.0, 6, true, 2, 4),
    grav(600.0, 6, 40.0, 6, true, 2, 5),
    grav(620.0, 6, 40.0, 7, true, 2, 5),
];

/// Chrono cascade tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RhythmConfig {
    /// Nodes on the ring
    pub node_count: u32,
    /// Revolutions per second
    pub speed: f32,
    /// Progress distance graded Perfect
    pub perfect_window: f32,
    /// Progress distance graded Good
    pub good_window: f32,
    pub rounds: u32,
    /// Reverse nodes may appear
    pub reverse_nodes: bool,
    /// Double nodes may appear
    pub double_nodes: bool,
}

impl RhythmConfig {
    pub fn for_level(level: u32) -> Self {
        RHYTHM_LEVELS[level_index(level)]
    }
}

const fn ring(
    node_count: u32,
    speed: f32,
    perfect_window: f32,
    good_window: f32,
    rounds: u32,
    reverse_nodes: bool,
    double_nodes: bool,
) -> RhythmConfig {
    RhythmConfig {
        node_count,
        speed,
        perfect_window,
        good_window,
        rounds,
        reverse_nodes,
        double_nodes,
    }
}

pub const RHYTHM_LEVELS: [RhythmConfig; 12] = [
    ring(4, 0.20, 0.030, 0.070, 2, false, false),
    ring(5, 0.20, 0.030, 0.070, 2, false, false),
    ring(5, 0.22, 0.028, 0.065, 3, true, false),
    ring(6, 0.22, 0.026, 0.060, 3, true, false),
    ring(6, 0.25, 0.025, 0.055, 3, true, true),
    ring(7, 0.25, 0.024, 0.050, 3, true, true),
    ring(7, 0.28, 0.022, 0.048, 4, true, true),
    ring(8, 0.28, 0.020, 0.045, 4, true, true),
    ring(8, 0.30, 0.020, 0.042, 4, true, true),
    ring(9, 0.30, 0.018, 0.040, 4, true, true),
    ring(9, 0.33, 0.017, 0.038, 5, true, true),
    ring(10, 0.35, 0.015, 0.035, 5, true, true),
];
