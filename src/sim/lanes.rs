//! Momentum catch engine
//!
//! Orbs slide right-to-left along a few lanes. Tapping one while it is inside
//! the catch zone scores it. Consecutive catches build a combo multiplier
//! that decays if the player goes quiet for too long.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::session::{CompletionFn, Session};
use super::timers::TimerHandle;
use super::{MiniGame, Outcome, PlayState};
use crate::GameId;
use crate::consts::FEEDBACK_TEXT_DURATION;
use crate::feedback::{Cue, Feedback};
use crate::tuning::LaneConfig;

/// X where new objects appear
pub const SPAWN_X: f32 = 400.0;
pub const OBJECT_RADIUS: f32 = 20.0;
/// Catch zone band (inclusive)
pub const TARGET_ZONE_MIN: f32 = 60.0;
pub const TARGET_ZONE_MAX: f32 = 140.0;

/// Chance that a spawned orb is golden or danger (when unlocked)
pub const SPECIAL_CHANCE: f64 = 0.2;
/// Chance that a spawn slot yields a power-up (when unlocked)
pub const POWER_UP_CHANCE: f64 = 0.08;
pub const POWER_UP_DURATION: f32 = 5.0;
/// Seconds without a catch before the combo drops
pub const COMBO_TIMEOUT: f32 = 2.0;
/// Combo steps that still raise the multiplier
pub const COMBO_CAP: u32 = 10;

pub const NORMAL_POINTS: u32 = 1;
pub const GOLDEN_POINTS: u32 = 3;
pub const DANGER_PENALTY: u32 = 2;

/// What slides down a lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Normal,
    Golden,
    Danger,
    PowerUp(PowerUpKind),
}

/// Temporary modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Everything moves at half speed
    SlowMotion,
    /// Catches are worth double
    DoublePoints,
    /// Spawns come twice as often
    RapidSpawn,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::SlowMotion,
        PowerUpKind::DoublePoints,
        PowerUpKind::RapidSpawn,
    ];
}

/// An object travelling along a lane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneObject {
    pub id: u32,
    pub lane: u32,
    /// Horizontal position of the center
    pub x: f32,
    pub kind: ObjectKind,
}

impl LaneObject {
    pub fn in_target_zone(&self) -> bool {
        (TARGET_ZONE_MIN..=TARGET_ZONE_MAX).contains(&self.x)
    }
}

/// Snapshot of a momentum catch attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneState {
    pub config: LaneConfig,
    pub level: u32,
    pub phase: PlayState,
    /// Active objects (sorted by id)
    pub objects: Vec<LaneObject>,
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub multiplier: f32,
    pub time_remaining: f32,
    /// Seconds since the last spawn
    pub spawn_timer: f32,
    /// Seconds since the last catch
    pub since_last_catch: f32,
    pub active_power_up: Option<PowerUpKind>,
    /// Transient "+3" style text
    pub feedback_text: Option<String>,
    pub catches: u32,
    pub dangers_hit: u32,
    next_id: u32,
}

impl LaneState {
    pub fn new(level: u32) -> Self {
        let config = LaneConfig::for_level(level);
        Self {
            config,
            level,
            phase: PlayState::Ready,
            objects: Vec::new(),
            score: 0,
            combo: 0,
            max_combo: 0,
            multiplier: 1.0,
            time_remaining: config.time_limit,
            spawn_timer: 0.0,
            since_last_catch: 0.0,
            active_power_up: None,
            feedback_text: None,
            catches: 0,
            dangers_hit: 0,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Current horizontal speed (halved by slow motion)
    pub fn speed(&self) -> f32 {
        if self.active_power_up == Some(PowerUpKind::SlowMotion) {
            self.config.base_speed * 0.5
        } else {
            self.config.base_speed
        }
    }

    /// Current spawn interval (halved by rapid spawn)
    pub fn spawn_interval(&self) -> f32 {
        if self.active_power_up == Some(PowerUpKind::RapidSpawn) {
            self.config.spawn_interval * 0.5
        } else {
            self.config.spawn_interval
        }
    }

    fn reset_combo(&mut self) {
        self.combo = 0;
        self.multiplier = 1.0;
    }
}

/// Combo multiplier: +10% per combo step, capped
pub fn combo_multiplier(combo: u32) -> f32 {
    1.0 + combo.min(COMBO_CAP) as f32 * 0.1
}

/// Stars from how far past the target the score went
pub fn star_rating(score: u32, target: u32) -> u8 {
    let ratio = score as f32 / target.max(1) as f32;
    if ratio >= 1.5 {
        3
    } else if ratio >= 1.2 {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    PowerUpExpired(PowerUpKind),
    ClearText,
}

/// Momentum catch engine
#[derive(Debug)]
pub struct LaneGame {
    state: LaneState,
    session: Session<Effect>,
    rng: Pcg32,
    text_timer: Option<TimerHandle>,
}

impl LaneGame {
    pub fn new(seed: u64, feedback: Feedback) -> Self {
        Self {
            state: LaneState::new(1),
            session: Session::new(feedback),
            rng: Pcg32::seed_from_u64(seed),
            text_timer: None,
        }
    }

    pub fn state(&self) -> &LaneState {
        &self.state
    }

    /// Player tapped the object with `id`. Returns true if it was caught.
    pub fn tap(&mut self, id: u32) -> bool {
        if !self.session.is_active() || self.state.phase != PlayState::Playing {
            return false;
        }
        let Some(idx) = self.state.objects.iter().position(|o| o.id == id) else {
            return false;
        };
        if !self.state.objects[idx].in_target_zone() {
            self.session.emit(Cue::Miss);
            return false;
        }

        let object = self.state.objects.remove(idx);
        match object.kind {
            ObjectKind::Normal => self.catch_orb(NORMAL_POINTS, 1, Cue::OrbCaught),
            ObjectKind::Golden => self.catch_orb(GOLDEN_POINTS, 2, Cue::GoldenCaught),
            ObjectKind::Danger => self.hit_danger(),
            ObjectKind::PowerUp(kind) => self.activate_power_up(kind),
        }
        self.check_win();
        true
    }

    fn catch_orb(&mut self, base: u32, combo_step: u32, cue: Cue) {
        let s = &mut self.state;
        let double = if s.active_power_up == Some(PowerUpKind::DoublePoints) {
            2.0
        } else {
            1.0
        };
        let points = (base as f32 * s.multiplier * double).round() as u32;
        s.score += points;
        s.combo += combo_step;
        s.max_combo = s.max_combo.max(s.combo);
        s.multiplier = combo_multiplier(s.combo);
        s.since_last_catch = 0.0;
        s.catches += 1;

        let text = if s.combo >= 5 {
            format!("+{} Combo x{}", points, s.combo)
        } else {
            format!("+{}", points)
        };
        self.session.emit(cue);
        self.show_text(text);
    }

    fn hit_danger(&mut self) {
        let s = &mut self.state;
        s.score = s.score.saturating_sub(DANGER_PENALTY);
        s.reset_combo();
        s.dangers_hit += 1;
        self.session.emit(Cue::DangerHit);
        self.show_text(format!("-{}", DANGER_PENALTY));
    }

    fn activate_power_up(&mut self, kind: PowerUpKind) {
        log::debug!("power-up {:?} active", kind);
        self.state.active_power_up = Some(kind);
        self.session.cancel_where(|e| matches!(e, Effect::PowerUpExpired(_)));
        self.session.schedule(POWER_UP_DURATION, Effect::PowerUpExpired(kind));
        self.session.emit(Cue::PowerUp);
        self.show_text(match kind {
            PowerUpKind::SlowMotion => "Slow Motion".to_string(),
            PowerUpKind::DoublePoints => "Double Points".to_string(),
            PowerUpKind::RapidSpawn => "Rapid Fire".to_string(),
        });
    }

    /// Show transient text, replacing (and un-scheduling) any older text
    fn show_text(&mut self, text: String) {
        if let Some(handle) = self.text_timer.take() {
            self.session.cancel(handle);
        }
        self.state.feedback_text = Some(text);
        self.text_timer = Some(self.session.schedule(FEEDBACK_TEXT_DURATION, Effect::ClearText));
    }

    fn check_win(&mut self) {
        if self.state.phase == PlayState::Playing
            && self.state.score >= self.state.config.target_score
        {
            self.finish(true);
        }
    }

    fn finish(&mut self, won: bool) {
        self.state.phase = if won {
            PlayState::Success
        } else {
            PlayState::Failed
        };
        let stars = star_rating(self.state.score, self.state.config.target_score);
        self.session.conclude(Outcome::new(self.state.score, stars, won));
    }

    fn insert_object(&mut self, lane: u32, x: f32, kind: ObjectKind) -> u32 {
        let id = self.state.next_entity_id();
        self.state.objects.push(LaneObject { id, lane, x, kind });
        id
    }

    fn spawn(&mut self) {
        let cfg = self.state.config;
        let lane = self.rng.random_range(0..cfg.lanes.max(1));

        let kind = if cfg.power_ups && self.rng.random_bool(POWER_UP_CHANCE) {
            let i = self.rng.random_range(0..PowerUpKind::ALL.len());
            ObjectKind::PowerUp(PowerUpKind::ALL[i])
        } else {
            let mut specials = Vec::with_capacity(2);
            if cfg.golden {
                specials.push(ObjectKind::Golden);
            }
            if cfg.danger {
                specials.push(ObjectKind::Danger);
            }
            if !specials.is_empty() && self.rng.random_bool(SPECIAL_CHANCE) {
                specials[self.rng.random_range(0..specials.len())]
            } else {
                ObjectKind::Normal
            }
        };
        self.insert_object(lane, SPAWN_X, kind);
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::PowerUpExpired(kind) => {
                if self.state.active_power_up == Some(kind) {
                    log::debug!("power-up {:?} expired", kind);
                    self.state.active_power_up = None;
                }
            }
            Effect::ClearText => {
                self.text_timer = None;
                self.state.feedback_text = None;
            }
        }
    }

    fn step(&mut self, dt: f32) {
        // Combo decay
        self.state.since_last_catch += dt;
        if self.state.combo > 0 && self.state.since_last_catch > COMBO_TIMEOUT {
            self.state.reset_combo();
        }

        // Movement
        let dx = self.state.speed() * dt;
        for object in &mut self.state.objects {
            object.x -= dx;
        }
        self.state.objects.retain(|o| o.x >= -OBJECT_RADIUS);

        // Spawning
        self.state.spawn_timer += dt;
        let interval = self.state.spawn_interval().max(0.01);
        while self.state.spawn_timer >= interval {
            self.state.spawn_timer -= interval;
            self.spawn();
        }

        // Clock
        self.state.time_remaining -= dt;
        if self.state.time_remaining <= 0.0 {
            self.state.time_remaining = 0.0;
            let won = self.state.score >= self.state.config.target_score;
            self.finish(won);
        }
    }
}

impl MiniGame for LaneGame {
    fn game(&self) -> GameId {
        GameId::MomentumCatch
    }

    fn level(&self) -> u32 {
        self.state.level
    }

    fn start(&mut self, level: u32) {
        self.session.restart();
        self.text_timer = None;
        self.state = LaneState::new(level);
        self.state.phase = PlayState::Playing;
        log::info!(
            "momentum catch level {}: target {} in {}s",
            level,
            self.state.config.target_score,
            self.state.config.time_limit
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
