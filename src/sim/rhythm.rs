//! Chrono cascade engine
//!
//! A sweep runs once around a ring per round. Nodes sit at even steps on
//! the ring and the player taps as the sweep passes each one; taps are
//! graded by how far the sweep was from the node.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::session::{CompletionFn, Session};
use super::timers::TimerHandle;
use super::{MiniGame, Outcome, PlayState};
use crate::GameId;
use crate::consts::FEEDBACK_TEXT_DURATION;
use crate::feedback::{Cue, Feedback};
use crate::tuning::RhythmConfig;

/// Chance per node of each special kind, when unlocked
pub const SPECIAL_NODE_CHANCE: f64 = 0.12;

pub const PERFECT_POINTS: u32 = 100;
pub const PERFECT_COMBO_STEP: u32 = 10;
pub const GOOD_POINTS: u32 = 50;
pub const GOOD_COMBO_STEP: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Normal,
    /// Flips the ring's spin when hit
    Reverse,
    /// Pays out twice
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Perfect,
    Good,
    Miss,
}

impl Grade {
    pub fn label(&self) -> &'static str {
        match self {
            Grade::Perfect => "Perfect",
            Grade::Good => "Good",
            Grade::Miss => "Miss",
        }
    }

    fn cue(&self) -> Cue {
        match self {
            Grade::Perfect => Cue::Perfect,
            Grade::Good => Cue::Good,
            Grade::Miss => Cue::Miss,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimingNode {
    pub kind: NodeKind,
    /// Grade once the sweep or a tap has dealt with this node
    pub grade: Option<Grade>,
}

/// Snapshot of a chrono cascade attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmState {
    pub config: RhythmConfig,
    pub level: u32,
    pub phase: PlayState,
    /// Sweep position in [0, 1)
    pub progress: f32,
    pub nodes: Vec<TimingNode>,
    /// Next node awaiting a grade
    pub current_node: usize,
    /// 1-based
    pub round: u32,
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_count: u32,
    pub good_count: u32,
    /// Misses over the whole attempt
    pub miss_count: u32,
    /// Visual spin direction, +1 or -1
    pub spin: f32,
    pub last_grade: Option<Grade>,
    pub feedback_text: Option<String>,
}

impl RhythmState {
    pub fn new(level: u32) -> Self {
        let config = RhythmConfig::for_level(level);
        Self {
            config,
            level,
            phase: PlayState::Ready,
            progress: 0.0,
            nodes: vec![TimingNode::default(); config.node_count as usize],
            current_node: 0,
            round: 1,
            score: 0,
            combo: 0,
            max_combo: 0,
            perfect_count: 0,
            good_count: 0,
            miss_count: 0,
            spin: 1.0,
            last_grade: None,
            feedback_text: None,
        }
    }

    /// Sweep position at which node `index` should be tapped
    pub fn target(&self, index: usize) -> f32 {
        index as f32 / self.nodes.len().max(1) as f32
    }

    /// Misses that end the attempt
    pub fn miss_limit(&self) -> u32 {
        self.config.node_count / 2 + 1
    }

    pub fn grade_for(&self, diff: f32) -> Grade {
        if diff < self.config.perfect_window {
            Grade::Perfect
        } else if diff < self.config.good_window {
            Grade::Good
        } else {
            Grade::Miss
        }
    }
}

/// Stars from accuracy and the longest combo
pub fn star_rating(perfect: u32, miss: u32, max_combo: u32, node_count: u32, rounds: u32) -> u8 {
    let accuracy = perfect as f32 / (perfect + miss + 1) as f32;
    let combo_bonus = max_combo as f32 / (node_count * rounds).max(1) as f32;
    if accuracy > 0.8 && combo_bonus > 0.5 {
        3
    } else if accuracy > 0.5 {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    ClearText,
}

/// Chrono cascade engine
#[derive(Debug)]
pub struct RhythmGame {
    state: RhythmState,
    session: Session<Effect>,
    rng: Pcg32,
    text_timer: Option<TimerHandle>,
}

impl RhythmGame {
    pub fn new(seed: u64, feedback: Feedback) -> Self {
        Self {
            state: RhythmState::new(1),
            session: Session::new(feedback),
            rng: Pcg32::seed_from_u64(seed),
            text_timer: None,
        }
    }

    pub fn state(&self) -> &RhythmState {
        &self.state
    }

    /// Roll a fresh ring for the current round
    pub fn generate_nodes(&mut self) {
        let cfg = self.state.config;
        self.state.nodes = (0..cfg.node_count)
            .map(|i| {
                let kind = if i == 0 {
                    NodeKind::Normal
                } else if cfg.reverse_nodes && self.rng.random_bool(SPECIAL_NODE_CHANCE) {
                    NodeKind::Reverse
                } else if cfg.double_nodes && self.rng.random_bool(SPECIAL_NODE_CHANCE) {
                    NodeKind::Double
                } else {
                    NodeKind::Normal
                };
                TimingNode { kind, grade: None }
            })
            .collect();
        self.state.current_node = 0;
        self.state.progress = 0.0;
    }

    /// Tap the ring. Grades the current node and moves on to the next one.
    pub fn tap(&mut self) -> Option<Grade> {
        if !self.session.is_active() || self.state.phase != PlayState::Playing {
            return None;
        }
        let index = self.state.current_node;
        if index >= self.state.nodes.len() {
            return None;
        }
        let diff = (self.state.progress - self.state.target(index)).abs();
        let grade = self.state.grade_for(diff);
        self.grade_node(index, grade);
        self.check_failure();
        Some(grade)
    }

    fn grade_node(&mut self, index: usize, grade: Grade) {
        let s = &mut self.state;
        let node = &mut s.nodes[index];
        node.grade = Some(grade);
        let kind = node.kind;

        let points = match grade {
            Grade::Perfect => {
                s.perfect_count += 1;
                PERFECT_POINTS + s.combo * PERFECT_COMBO_STEP
            }
            Grade::Good => {
                s.good_count += 1;
                GOOD_POINTS + s.combo * GOOD_COMBO_STEP
            }
            Grade::Miss => {
                s.miss_count += 1;
                0
            }
        };
        if grade == Grade::Miss {
            s.combo = 0;
        } else {
            let multiplier = if kind == NodeKind::Double { 2 } else { 1 };
            s.score += points * multiplier;
            s.combo += 1;
            s.max_combo = s.max_combo.max(s.combo);
            if kind == NodeKind::Reverse {
                s.spin = -s.spin;
            }
        }
        s.last_grade = Some(grade);
        s.current_node = index + 1;

        log::trace!("node {} {:?} (combo {})", index, grade, s.combo);
        self.session.emit(grade.cue());
        self.show_text(grade.label().to_string());
    }

    fn show_text(&mut self, text: String) {
        if let Some(handle) = self.text_timer.take() {
            self.session.cancel(handle);
        }
        self.state.feedback_text = Some(text);
        self.text_timer = Some(self.session.schedule(FEEDBACK_TEXT_DURATION, Effect::ClearText));
    }

    /// Returns true if the attempt just failed
    fn check_failure(&mut self) -> bool {
        if self.state.phase == PlayState::Playing
            && self.state.miss_count >= self.state.miss_limit()
        {
            self.finish(false);
            true
        } else {
            false
        }
    }

    fn finish(&mut self, won: bool) {
        let s = &mut self.state;
        s.phase = if won {
            PlayState::Success
        } else {
            PlayState::Failed
        };
        let stars = star_rating(
            s.perfect_count,
            s.miss_count,
            s.max_combo,
            s.config.node_count,
            s.config.rounds,
        );
        self.session.conclude(Outcome::new(s.score, stars, won));
    }

    fn end_round(&mut self) {
        // Anything the sweep never reached counts as missed
        while self.state.current_node < self.state.nodes.len() {
            self.grade_node(self.state.current_node, Grade::Miss);
            if self.check_failure() {
                return;
            }
        }
        if self.state.round >= self.state.config.rounds {
            self.state.progress = 1.0;
            self.finish(true);
            return;
        }
        self.state.round += 1;
        log::debug!("chrono cascade round {}", self.state.round);
        self.session.emit(Cue::RoundComplete);
        self.generate_nodes();
    }

    fn step(&mut self, dt: f32) {
        self.state.progress += self.state.config.speed * dt;

        while self.state.current_node < self.state.nodes.len() {
            let index = self.state.current_node;
            if self.state.progress <= self.state.target(index) + self.state.config.good_window {
                break;
            }
            self.grade_node(index, Grade::Miss);
            if self.check_failure() {
                return;
            }
        }

        if self.state.progress >= 1.0 {
            self.end_round();
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::ClearText => {
                self.text_timer = None;
                self.state.feedback_text = None;
            }
        }
    }
}

impl MiniGame for RhythmGame {
    fn game(&self) -> GameId {
        GameId::ChronoCascade
    }

    fn level(&self) -> u32 {
        self.state.level
    }

    fn start(&mut self, level: u32) {
        self.session.restart();
        self.text_timer = None;
        self.state = RhythmState::new(level);
        self.generate_nodes();
        self.state.phase = PlayState::Playing;
        log::info!(
            "chrono cascade level {}: {} nodes x {} rounds",
            level,
            self.state.config.node_count,
            self.state.config.rounds
        );
    }

    fn update(&mut self, dt: f32) {
        if !self.session.is_active() {
            return;
        }
        for effect in self.session.advance(dt) {
            self.apply(effect);
        }
        if self.state.phase == PlayState::Playing {
            self.step(dt);
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
        self.text_timer = None;
        self.session.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{COMPLETION_DELAY, SIM_DT};
    use crate::feedback::RecordingSink;
    use std::sync::{Arc, Mutex};

    fn started(level: u32) -> (RhythmGame, RecordingSink) {
        let sink = RecordingSink::new();
        let mut game = RhythmGame::new(3, Feedback::new(sink.clone()));
        game.start(level);
        (game, sink)
    }

    /// Tap every node dead on until the attempt ends
    fn play_perfectly(game: &mut RhythmGame) {
        for _ in 0..100_000 {
            if game.phase() != PlayState::Playing {
                return;
            }
            let s = game.state();
            if s.current_node < s.nodes.len() {
                let diff = (s.progress - s.target(s.current_node)).abs();
                if diff < s.config.perfect_window * 0.5 {
                    assert_eq!(game.tap(), Some(Grade::Perfect));
                    continue;
                }
            }
            game.update(SIM_DT);
        }
    }

    #[test]
    fn test_tap_on_first_node_is_perfect() {
        let (mut game, sink) = started(1);
        assert_eq!(game.tap(), Some(Grade::Perfect));
        let s = game.state();
        assert_eq!(s.score, PERFECT_POINTS);
        assert_eq!(s.combo, 1);
        assert_eq!(s.current_node, 1);
        assert_eq!(s.feedback_text.as_deref(), Some("Perfect"));
        assert_eq!(sink.count(Cue::Perfect), 1);
    }

    #[test]
    fn test_good_grade_uses_combo() {
        let (mut game, _) = started(1);
        game.tap();
        game.state.nodes[1].kind = NodeKind::Normal;
        // Node 1 sits at 0.25; 0.05 off is outside perfect, inside good
        game.state.progress = 0.30;
        assert_eq!(game.tap(), Some(Grade::Good));
        assert_eq!(game.score(), PERFECT_POINTS + GOOD_POINTS + GOOD_COMBO_STEP);
        assert_eq!(game.state().combo, 2);
    }

    #[test]
    fn test_miss_resets_combo_and_advances() {
        let (mut game, sink) = started(1);
        game.tap();
        game.state.progress = 0.12;
        assert_eq!(game.tap(), Some(Grade::Miss));
        let s = game.state();
        assert_eq!(s.combo, 0);
        assert_eq!(s.miss_count, 1);
        assert_eq!(s.current_node, 2);
        assert_eq!(sink.count(Cue::Miss), 1);
    }

    #[test]
    fn test_double_node_pays_twice() {
        let (mut game, _) = started(5);
        game.state.nodes[0].kind = NodeKind::Double;
        game.tap();
        assert_eq!(game.score(), PERFECT_POINTS * 2);
    }

    #[test]
    fn test_reverse_node_flips_spin_on_hit_only() {
        let (mut game, _) = started(3);
        game.state.nodes[0].kind = NodeKind::Reverse;
        game.state.nodes[1].kind = NodeKind::Reverse;
        game.tap();
        assert_eq!(game.state().spin, -1.0);
        game.state.progress = 0.01;
        assert_eq!(game.tap(), Some(Grade::Miss));
        assert_eq!(game.state().spin, -1.0);
    }

    #[test]
    fn test_passive_misses_fail_in_the_same_tick() {
        let (mut game, sink) = started(1);
        let limit = game.state().miss_limit();
        assert_eq!(limit, 3);
        for _ in 0..10_000 {
            game.update(SIM_DT);
            if game.state().miss_count >= limit {
                break;
            }
        }
        assert_eq!(game.state().miss_count, limit);
        assert_eq!(game.phase(), PlayState::Failed);
        assert_eq!(sink.count(Cue::LevelFailed), 1);
        assert!(!game.outcome().unwrap().won);
    }

    #[test]
    fn test_tapped_misses_fail_immediately() {
        let (mut game, _) = started(1);
        for _ in 0..3 {
            game.state.progress = game.state.target(game.state.current_node) + 0.2;
            game.tap();
        }
        assert_eq!(game.phase(), PlayState::Failed);
        assert_eq!(game.tap(), None);
    }

    #[test]
    fn test_perfect_run_clears_all_rounds() {
        let (mut game, sink) = started(1);
        let reported = Arc::new(Mutex::new(Vec::new()));
        let log = reported.clone();
        game.set_on_complete(Box::new(move |o| log.lock().unwrap().push(o)));

        play_perfectly(&mut game);
        assert_eq!(game.phase(), PlayState::Success);
        let s = game.state();
        assert_eq!(s.round, s.config.rounds);
        assert_eq!(s.perfect_count, s.config.node_count * s.config.rounds);
        assert_eq!(s.miss_count, 0);
        assert_eq!(sink.count(Cue::RoundComplete), 1);

        let mut t = 0.0;
        while t < COMPLETION_DELAY + 0.1 {
            game.update(SIM_DT);
            t += SIM_DT;
        }
        let reported = reported.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].stars, 3);
        assert!(reported[0].won);
    }

    #[test]
    fn test_new_round_regenerates_ring() {
        let (mut game, _) = started(12);
        // Tap everything early and let the sweep finish the round
        let n = game.state().nodes.len();
        for i in 0..n {
            game.state.progress = game.state.target(i);
            game.tap();
        }
        game.state.progress = 0.999;
        game.update(SIM_DT);
        let s = game.state();
        assert_eq!(s.round, 2);
        assert_eq!(s.current_node, 0);
        assert_eq!(s.progress, 0.0);
        assert!(s.nodes.iter().all(|n| n.grade.is_none()));
        assert_eq!(s.nodes[0].kind, NodeKind::Normal);
    }

    #[test]
    fn test_special_nodes_follow_level_unlocks() {
        let mut specials = 0;
        for seed in 0..200 {
            let mut game = RhythmGame::new(seed, Feedback::default());
            game.start(1);
            assert!(game.state().nodes.iter().all(|n| n.kind == NodeKind::Normal));

            game.start(12);
            let nodes = &game.state().nodes;
            assert_eq!(nodes[0].kind, NodeKind::Normal, "seed {seed}");
            specials += nodes.iter().filter(|n| n.kind != NodeKind::Normal).count();
        }
        assert!(specials > 0);
    }

    #[test]
    fn test_feedback_text_clears_and_restart_cancels() {
        let (mut game, _) = started(1);
        game.tap();
        assert!(game.state().feedback_text.is_some());
        for _ in 0..40 {
            game.update(SIM_DT);
        }
        assert!(game.state().feedback_text.is_none());

        game.tap();
        game.start(1);
        assert!(game.state().feedback_text.is_none());
        game.tap();
        // Fresh text gets its full display time
        for _ in 0..20 {
            game.update(SIM_DT);
        }
        assert_eq!(game.state().feedback_text.as_deref(), Some("Perfect"));
    }

    #[test]
    fn test_taps_ignored_after_teardown() {
        let (mut game, _) = started(1);
        game.teardown();
        assert_eq!(game.tap(), None);
        game.update(SIM_DT);
        assert_eq!(game.state().progress, 0.0);
    }

    #[test]
    fn test_star_rating() {
        assert_eq!(star_rating(10, 0, 10, 5, 2), 3);
        assert_eq!(star_rating(10, 0, 4, 5, 2), 2);
        assert_eq!(star_rating(3, 4, 3, 5, 2), 1);
    }
}
