//! Tile memory engine
//!
//! Each round lights up a sequence of distinct tiles, then the player taps
//! them back in order. Obstacle and bonus tiles are re-rolled every round and
//! the sequence grows by one tile per round.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::session::{CompletionFn, Session};
use super::{MiniGame, Outcome, PlayState};
use crate::GameId;
use crate::feedback::{Cue, Feedback};
use crate::tuning::SequenceConfig;

/// Dark gap between two lit tiles during playback
pub const SHOW_GAP: f32 = 0.2;
/// Time spent on the round-cleared screen
pub const ROUND_PAUSE: f32 = 1.0;
/// Time spent in Ready before the next playback starts
pub const READY_PAUSE: f32 = 0.5;

pub const ROUND_POINTS: u32 = 50;
pub const TIME_BONUS_MAX: u32 = 100;
/// Time bonus lost per whole second spent answering
pub const TIME_BONUS_DECAY: u32 = 10;
pub const BONUS_TILE_POINTS: u32 = 25;
pub const WRONG_TAP_PENALTY: u32 = 20;

/// Snapshot of a tile memory attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceState {
    pub config: SequenceConfig,
    pub level: u32,
    pub phase: PlayState,
    /// Current round (1-based)
    pub round: u32,
    /// Tiles to repeat this round
    pub sequence: Vec<usize>,
    /// Tiles tapped correctly so far this round
    pub player_progress: Vec<usize>,
    pub obstacles: BTreeSet<usize>,
    pub bonus_tiles: BTreeSet<usize>,
    /// Tile lit during playback
    pub highlighted: Option<usize>,
    /// Tile that ended the attempt
    pub wrong_tile: Option<usize>,
    pub score: u32,
    /// Points earned in the current round
    pub round_score: u32,
    /// Index of the tile being played back
    pub show_step: usize,
    /// Seconds into the current playback step
    pub show_clock: f32,
    /// Seconds spent answering this round
    pub round_clock: f32,
}

impl SequenceState {
    pub fn new(level: u32) -> Self {
        Self {
            config: SequenceConfig::for_level(level),
            level,
            phase: PlayState::Ready,
            round: 1,
            sequence: Vec::new(),
            player_progress: Vec::new(),
            obstacles: BTreeSet::new(),
            bonus_tiles: BTreeSet::new(),
            highlighted: None,
            wrong_tile: None,
            score: 0,
            round_score: 0,
            show_step: 0,
            show_clock: 0.0,
            round_clock: 0.0,
        }
    }

    /// Sequence length for the current round
    pub fn target_length(&self) -> usize {
        (self.config.sequence_length + self.round.saturating_sub(1)) as usize
    }

    /// Best score the level allows (round + max time bonus + two bonus tiles per round)
    pub fn max_possible_score(&self) -> u32 {
        let rounds = self.config.rounds;
        rounds * (ROUND_POINTS + TIME_BONUS_MAX) + rounds * BONUS_TILE_POINTS * 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    NextRound,
    BeginRound,
}

/// Stars from the share of the maximum score reached
pub fn star_rating(score: u32, max_possible: u32) -> u8 {
    if max_possible == 0 {
        return 1;
    }
    let percentage = score as f32 / max_possible as f32;
    if percentage >= 0.8 {
        3
    } else if percentage >= 0.5 {
        2
    } else {
        1
    }
}

/// Tile memory engine
#[derive(Debug)]
pub struct SequenceGame {
    state: SequenceState,
    session: Session<Effect>,
    rng: Pcg32,
}

impl SequenceGame {
    pub fn new(seed: u64, feedback: Feedback) -> Self {
        Self {
            state: SequenceState::new(1),
            session: Session::new(feedback),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &SequenceState {
        &self.state
    }

    /// Re-roll obstacle and bonus tiles. The two sets never overlap.
    pub fn randomize_special_tiles(&mut self) {
        let cfg = self.state.config;
        let mut tiles: Vec<usize> = (0..cfg.tile_count()).collect();
        tiles.shuffle(&mut self.rng);

        let obstacles = cfg.obstacle_count as usize;
        let bonus = cfg.bonus_count as usize;
        self.state.obstacles = tiles.iter().take(obstacles).copied().collect();
        self.state.bonus_tiles = tiles.iter().skip(obstacles).take(bonus).copied().collect();
    }

    /// Pick the round's sequence: distinct tiles, never obstacles. When too
    /// few tiles are free the sequence is simply shorter.
    pub fn generate_sequence(&mut self) -> &[usize] {
        let length = self.state.target_length();
        let mut free: Vec<usize> = (0..self.state.config.tile_count())
            .filter(|t| !self.state.obstacles.contains(t))
            .collect();
        free.shuffle(&mut self.rng);
        free.truncate(length);
        self.state.sequence = free;
        &self.state.sequence
    }

    /// Leave Ready and play back a fresh sequence
    pub fn begin_round(&mut self) -> bool {
        if !self.session.is_active() || self.state.phase != PlayState::Ready {
            return false;
        }
        self.session.cancel_where(|e| *e == Effect::BeginRound);

        self.randomize_special_tiles();
        self.generate_sequence();
        let s = &mut self.state;
        s.player_progress.clear();
        s.round_score = 0;
        s.highlighted = None;
        s.show_step = 0;
        s.show_clock = 0.0;
        s.round_clock = 0.0;
        s.phase = PlayState::Showing;
        log::debug!(
            "tile memory round {}/{}: {} tiles",
            s.round,
            s.config.rounds,
            s.sequence.len()
        );

        if self.state.sequence.is_empty() {
            self.finish_playback();
        }
        true
    }

    /// Player tapped a tile
    pub fn tap(&mut self, tile: usize) -> bool {
        if !self.session.is_active()
            || self.state.phase != PlayState::Playing
            || tile >= self.state.config.tile_count()
        {
            return false;
        }

        let expected = self.state.sequence.get(self.state.player_progress.len()).copied();
        if expected == Some(tile) {
            self.state.player_progress.push(tile);
            if self.state.bonus_tiles.contains(&tile) {
                self.state.score += BONUS_TILE_POINTS;
                self.state.round_score += BONUS_TILE_POINTS;
            }
            self.session.emit(Cue::Tap);

            if self.state.player_progress.len() == self.state.sequence.len() {
                self.complete_round();
            }
        } else {
            self.fail(tile);
        }
        true
    }

    fn finish_playback(&mut self) {
        self.state.highlighted = None;
        self.state.round_clock = 0.0;
        self.state.phase = PlayState::Playing;
        if self.state.sequence.is_empty() {
            self.complete_round();
        }
    }

    fn advance_playback(&mut self, dt: f32) {
        let step_time = self.state.config.show_time + SHOW_GAP;
        self.state.show_clock += dt;
        while self.state.show_clock >= step_time {
            self.state.show_clock -= step_time;
            self.state.show_step += 1;
        }

        if self.state.show_step >= self.state.sequence.len() {
            self.finish_playback();
            return;
        }

        self.state.highlighted = if self.state.show_clock < self.state.config.show_time {
            Some(self.state.sequence[self.state.show_step])
        } else {
            None
        };
    }

    fn time_bonus(&self) -> u32 {
        let seconds = self.state.round_clock.max(0.0).floor() as u32;
        TIME_BONUS_MAX.saturating_sub(seconds.saturating_mul(TIME_BONUS_DECAY))
    }

    fn complete_round(&mut self) {
        let points = ROUND_POINTS + self.time_bonus();
        self.state.score += points;
        self.state.round_score += points;
        self.state.phase = PlayState::Success;
        self.session.emit(Cue::RoundComplete);

        if self.state.round >= self.state.config.rounds {
            let stars = star_rating(self.state.score, self.state.max_possible_score());
            self.session.conclude(Outcome::new(self.state.score, stars, true));
        } else {
            self.session.schedule(ROUND_PAUSE, Effect::NextRound);
        }
    }

    fn fail(&mut self, tile: usize) {
        let s = &mut self.state;
        s.wrong_tile = Some(tile);
        s.score = s.score.saturating_sub(WRONG_TAP_PENALTY);
        s.phase = PlayState::Failed;
        self.session.emit(Cue::Error);

        let stars = star_rating(self.state.score, self.state.max_possible_score());
        self.session.conclude(Outcome::new(self.state.score, stars, false));
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::NextRound => {
                if self.state.phase != PlayState::Success {
                    return;
                }
                let s = &mut self.state;
                s.round += 1;
                s.phase = PlayState::Ready;
                s.sequence.clear();
                s.player_progress.clear();
                self.session.schedule(READY_PAUSE, Effect::BeginRound);
            }
            Effect::BeginRound => {
                self.begin_round();
            }
        }
    }
}

impl MiniGame for SequenceGame {
    fn game(&self) -> GameId {
        GameId::TileMemory
    }

    fn level(&self) -> u32 {
        self.state.level
    }

    fn start(&mut self, level: u32) {
        self.session.restart();
        self.state = SequenceState::new(level);
        log::info!(
            "tile memory level {}: grid {}x{}, {} rounds",
            level,
            self.state.config.grid_size,
            self.state.config.grid_size,
            self.state.config.rounds
        );
        self.begin_round();
    }

    fn update(&mut self, dt: f32) {
        if !self.session.is_active() {
            return;
        }
        for effect in self.session.advance(dt) {
            self.apply(effect);
        }
        match self.state.phase {
            PlayState::Showing => self.advance_playback(dt),
            PlayState::Playing => self.state.round_clock += dt,
            _ => {}
        }
    }

    fn phase(&self) -> PlayState {
        self.state.phase
    }

    fn score(&self) -> u32 {
        self.state.score
    }

    fn outcome(&self) -> Option<Outcome> {
        self.session.outcome()
    }

    fn set_on_complete(&mut self, callback: CompletionFn) {
        self.session.set_on_complete(callback);
    }

    fn teardown(&mut self) {
        self.session.teardown();
    }
}
