//! Gravity flux engine
//!
//! An orb falls under a gravity direction the player can flip a limited
//! number of times. Obstacles deflect it, portals move it, collectibles pay
//! out, and touching the target clears the level.
//!
//! Coordinates: origin at the arena's top-left, y grows downward.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Rect, circle_rect_collision, clamp_to_arena};
use super::session::{CompletionFn, Session};
use super::{MiniGame, Outcome, PlayState};
use crate::GameId;
use crate::feedback::{Cue, Feedback};
use crate::tuning::GravityConfig;

/// Arena dimensions
pub const ARENA_WIDTH: f32 = 360.0;
pub const ARENA_HEIGHT: f32 = 640.0;
pub const ORB_RADIUS: f32 = 15.0;
pub const ORB_START: Vec2 = Vec2::new(180.0, 80.0);
/// Target sits this far above the bottom wall
pub const TARGET_INSET: f32 = 80.0;

/// Velocity kept per tick
pub const FRICTION: f32 = 0.98;
/// Wall restitution
pub const WALL_RESTITUTION: f32 = 0.5;
/// Bounce obstacles hand back more energy than they receive
pub const BOUNCE_FACTOR: f32 = -1.2;
pub const SOLID_DAMPING: f32 = -0.3;
/// Distance a solid obstacle shoves the orb per contact
pub const SOLID_PUSH: f32 = 5.0;
/// Speed cap so bounce chains stay playable
pub const MAX_SPEED: f32 = 1500.0;
/// Wall impacts slower than this are silent
pub const BOUNCE_CUE_SPEED: f32 = 60.0;

pub const COLLECT_RADIUS: f32 = 25.0;
pub const PORTAL_RADIUS: f32 = 20.0;
pub const TARGET_RADIUS: f32 = 30.0;
/// Shorter drags are treated as taps
pub const MIN_SWIPE: f32 = 20.0;

pub const COLLECTIBLE_POINTS: u32 = 50;
pub const PORTAL_POINTS: u32 = 10;
pub const TIME_BONUS_PER_SECOND: u32 = 2;
pub const EFFICIENCY_BONUS: u32 = 100;
pub const FULL_COLLECTION_BONUS: u32 = 150;

/// Attempts per generated element before giving up on it
const PLACEMENT_ATTEMPTS: u32 = 50;

/// Gravity direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GravityDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl GravityDirection {
    /// Unit vector in arena coordinates
    pub fn vector(&self) -> Vec2 {
        match self {
            GravityDirection::Up => Vec2::NEG_Y,
            GravityDirection::Down => Vec2::Y,
            GravityDirection::Left => Vec2::NEG_X,
            GravityDirection::Right => Vec2::X,
        }
    }

    /// Direction of a swipe by its dominant axis
    pub fn from_swipe(delta: Vec2) -> Option<Self> {
        if !delta.is_finite() || delta.length() < MIN_SWIPE {
            return None;
        }
        Some(if delta.x.abs() > delta.y.abs() {
            if delta.x > 0.0 {
                GravityDirection::Right
            } else {
                GravityDirection::Left
            }
        } else if delta.y > 0.0 {
            GravityDirection::Down
        } else {
            GravityDirection::Up
        })
    }
}

/// Obstacle types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Shoves the orb out and soaks up most of its speed
    Solid,
    /// Throws the orb back faster than it arrived
    Bounce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub rect: Rect,
    pub kind: ObstacleKind,
}

/// One-way portal: touching `entry` moves the orb to `exit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portal {
    pub entry: Vec2,
    pub exit: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collectible {
    pub pos: Vec2,
    pub collected: bool,
}

/// Snapshot of a gravity flux attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GravityState {
    pub config: GravityConfig,
    pub level: u32,
    pub phase: PlayState,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub gravity: GravityDirection,
    /// Gravity changes used
    pub moves: u32,
    pub obstacles: Vec<Obstacle>,
    pub portals: Vec<Portal>,
    pub collectibles: Vec<Collectible>,
    pub target: Vec2,
    pub time_remaining: f32,
    pub score: u32,
    /// Exit the orb last arrived at; portals stay quiet until it leaves
    pub portal_guard: Option<Vec2>,
}

impl GravityState {
    pub fn new(level: u32) -> Self {
        let config = GravityConfig::for_level(level);
        Self {
            config,
            level,
            phase: PlayState::Ready,
            pos: ORB_START,
            vel: Vec2::ZERO,
            radius: ORB_RADIUS,
            gravity: GravityDirection::Down,
            moves: 0,
            obstacles: Vec::new(),
            portals: Vec::new(),
            collectibles: Vec::new(),
            target: Vec2::new(ARENA_WIDTH / 2.0, ARENA_HEIGHT - TARGET_INSET),
            time_remaining: config.time_limit,
            score: 0,
            portal_guard: None,
        }
    }

    pub fn arena(&self) -> Vec2 {
        Vec2::new(ARENA_WIDTH, ARENA_HEIGHT)
    }

    pub fn moves_left(&self) -> u32 {
        self.config.max_moves.saturating_sub(self.moves)
    }

    pub fn collected_count(&self) -> usize {
        self.collectibles.iter().filter(|c| c.collected).count()
    }

    pub fn all_collected(&self) -> bool {
        self.collectibles.iter().all(|c| c.collected)
    }

    /// Share of collectibles picked up (1.0 when there are none)
    pub fn collected_ratio(&self) -> f32 {
        if self.collectibles.is_empty() {
            1.0
        } else {
            self.collected_count() as f32 / self.collectibles.len() as f32
        }
    }

    pub fn move_efficiency(&self) -> f32 {
        if self.config.max_moves == 0 {
            return 1.0;
        }
        1.0 - self.moves as f32 / self.config.max_moves as f32
    }
}

/// What happened during one physics step
#[derive(Debug, Clone, Default)]
pub struct StepEvents {
    /// Impact speed of the hardest wall hit, if any
    pub wall_impact: Option<f32>,
    pub obstacle_hits: u32,
    /// Indices of collectibles picked up this step
    pub collected: Vec<usize>,
    /// Index of the portal used this step
    pub teleported: Option<usize>,
    pub reached_target: bool,
}

/// Advance the orb by one fixed timestep
///
/// Gravity, friction, integration, obstacle response, arena clamp, then
/// the proximity checks against portals, collectibles and the target.
pub fn step_physics(state: &mut GravityState, dt: f32) -> StepEvents {
    let mut events = StepEvents::default();

    state.vel += state.gravity.vector() * state.config.gravity_strength * dt;
    state.vel *= FRICTION;
    state.vel = state.vel.clamp_length_max(MAX_SPEED);
    state.pos += state.vel * dt;

    for obstacle in &state.obstacles {
        let hit = circle_rect_collision(state.pos, state.radius, &obstacle.rect);
        if !hit.hit {
            continue;
        }
        events.obstacle_hits += 1;
        match obstacle.kind {
            ObstacleKind::Bounce => {
                state.pos += hit.normal * hit.penetration;
                state.vel *= BOUNCE_FACTOR;
            }
            ObstacleKind::Solid => {
                let away = (state.pos - obstacle.rect.center()).normalize_or(Vec2::NEG_Y);
                state.pos += away * SOLID_PUSH;
                state.vel *= SOLID_DAMPING;
            }
        }
    }
    state.vel = state.vel.clamp_length_max(MAX_SPEED);

    let before = state.vel;
    let arena = state.arena();
    if clamp_to_arena(&mut state.pos, &mut state.vel, state.radius, arena, WALL_RESTITUTION) {
        let impact = (before - state.vel).length() / (1.0 + WALL_RESTITUTION);
        events.wall_impact = Some(impact);
    }

    // Portals
    if let Some(exit) = state.portal_guard {
        if state.pos.distance(exit) > PORTAL_RADIUS {
            state.portal_guard = None;
        }
    }
    if state.portal_guard.is_none() {
        if let Some(i) = state
            .portals
            .iter()
            .position(|p| state.pos.distance(p.entry) < PORTAL_RADIUS)
        {
            let exit = state.portals[i].exit;
            state.pos = exit;
            clamp_to_arena(&mut state.pos, &mut state.vel, state.radius, arena, WALL_RESTITUTION);
            state.portal_guard = Some(state.pos);
            events.teleported = Some(i);
        }
    }

    for (i, c) in state.collectibles.iter_mut().enumerate() {
        if !c.collected && state.pos.distance(c.pos) < COLLECT_RADIUS {
            c.collected = true;
            events.collected.push(i);
        }
    }

    events.reached_target = state.pos.distance(state.target) < TARGET_RADIUS;
    events
}

/// Stars from move efficiency and collection
pub fn star_rating(move_efficiency: f32, all_collected: bool, collected_ratio: f32) -> u8 {
    if move_efficiency > 0.5 && all_collected {
        3
    } else if collected_ratio >= 0.5 {
        2
    } else {
        1
    }
}

/// Lay out obstacles, portals and collectibles for a level
pub fn generate_layout(state: &mut GravityState, rng: &mut impl Rng) {
    let cfg = state.config;
    state.target = Vec2::new(
        rng.random_range(60.0..ARENA_WIDTH - 60.0),
        ARENA_HEIGHT - TARGET_INSET,
    );
    let keep_clear = [ORB_START, state.target];

    state.obstacles.clear();
    for _ in 0..cfg.obstacle_count {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let w = rng.random_range(60.0..140.0);
            let h = rng.random_range(16.0..30.0);
            let rect = Rect::new(
                rng.random_range(0.0..ARENA_WIDTH - w),
                rng.random_range(140.0..ARENA_HEIGHT - 140.0 - h),
                w,
                h,
            );
            let padded = rect.inflate(ORB_RADIUS * 2.0);
            if keep_clear.iter().any(|p| padded.contains(*p))
                || state
                    .obstacles
                    .iter()
                    .any(|o| padded.intersects(&o.rect))
            {
                continue;
            }
            let kind = if cfg.bounce_obstacles && rng.random_bool(0.35) {
                ObstacleKind::Bounce
            } else {
                ObstacleKind::Solid
            };
            state.obstacles.push(Obstacle { rect, kind });
            break;
        }
    }

    let mut taken: Vec<Vec2> = keep_clear.to_vec();
    let mut free_point = |state: &GravityState, rng: &mut dyn FnMut() -> Vec2| -> Option<Vec2> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let p = rng();
            let clear_of_points = taken.iter().all(|t| t.distance(p) > 60.0);
            let clear_of_obstacles = state
                .obstacles
                .iter()
                .all(|o| !o.rect.inflate(ORB_RADIUS + 5.0).contains(p));
            if clear_of_points && clear_of_obstacles {
                taken.push(p);
                return Some(p);
            }
        }
        None
    };
    let mut random_point = || {
        Vec2::new(
            rng.random_range(40.0..ARENA_WIDTH - 40.0),
            rng.random_range(120.0..ARENA_HEIGHT - 120.0),
        )
    };

    state.portals.clear();
    for _ in 0..cfg.portal_pairs {
        let entry = free_point(&*state, &mut random_point);
        let exit = free_point(&*state, &mut random_point);
        if let (Some(entry), Some(exit)) = (entry, exit) {
            state.portals.push(Portal { entry, exit });
        }
    }

    state.collectibles.clear();
    for _ in 0..cfg.collectible_count {
        if let Some(pos) = free_point(&*state, &mut random_point) {
            state.collectibles.push(Collectible {
                pos,
                collected: false,
            });
        }
    }
}

/// Gravity flux engine
#[derive(Debug)]
pub struct GravityGame {
    state: GravityState,
    session: Session<()>,
    rng: Pcg32,
}

impl GravityGame {
    pub fn new(seed: u64, feedback: Feedback) -> Self {
        Self {
            state: GravityState::new(1),
            session: Session::new(feedback),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &GravityState {
        &self.state
    }

    /// Point gravity somewhere else. Costs one move; a no-op when the
    /// direction is unchanged or no moves are left.
    pub fn set_gravity(&mut self, direction: GravityDirection) -> bool {
        if !self.session.is_active() || self.state.phase != PlayState::Playing {
            return false;
        }
        if direction == self.state.gravity {
            return false;
        }
        if self.state.moves >= self.state.config.max_moves {
            self.session.emit(Cue::Error);
            return false;
        }
        self.state.gravity = direction;
        self.state.moves += 1;
        log::debug!(
            "gravity {:?} ({} moves left)",
            direction,
            self.state.moves_left()
        );
        self.session.emit(Cue::GravityShift);
        true
    }

    /// Swipe gesture; the dominant axis picks the direction
    pub fn swipe(&mut self, delta: Vec2) -> bool {
        match GravityDirection::from_swipe(delta) {
            Some(direction) => self.set_gravity(direction),
            None => false,
        }
    }

    fn handle(&mut self, events: StepEvents) {
        if events.wall_impact.is_some_and(|v| v > BOUNCE_CUE_SPEED) || events.obstacle_hits > 0 {
            self.session.emit(Cue::Bounce);
        }
        if events.teleported.is_some() {
            self.state.score += PORTAL_POINTS;
            self.session.emit(Cue::Portal);
        }
        for _ in &events.collected {
            self.state.score += COLLECTIBLE_POINTS;
            self.session.emit(Cue::Collect);
        }
        if events.reached_target {
            self.complete();
        }
    }

    fn complete(&mut self) {
        let s = &mut self.state;
        s.phase = PlayState::Success;
        s.vel = Vec2::ZERO;
        s.score += s.time_remaining.max(0.0) as u32 * TIME_BONUS_PER_SECOND;
        if s.moves < s.config.max_moves / 2 {
            s.score += EFFICIENCY_BONUS;
        }
        if !s.collectibles.is_empty() && s.all_collected() {
            s.score += FULL_COLLECTION_BONUS;
        }
        let stars = star_rating(s.move_efficiency(), s.all_collected(), s.collected_ratio());
        let outcome = Outcome::new(s.score, stars, true);
        self.session.conclude(outcome);
    }

    fn fail(&mut self) {
        let s = &mut self.state;
        s.time_remaining = 0.0;
        s.phase = PlayState::Failed;
        let stars = star_rating(s.move_efficiency(), s.all_collected(), s.collected_ratio());
        let outcome = Outcome::new(s.score, stars, false);
        self.session.conclude(outcome);
    }
}

impl MiniGame for GravityGame {
    fn game(&self) -> GameId {
        GameId::GravityFlux
    }

    fn level(&self) -> u32 {
        self.state.level
    }

    fn start(&mut self, level: u32) {
        self.session.restart();
        let mut state = GravityState::new(level);
        generate_layout(&mut state, &mut self.rng);
        state.phase = PlayState::Playing;
        log::info!(
            "gravity flux level {}: {} obstacles, {} portals, {} collectibles, {} moves",
            level,
            state.obstacles.len(),
            state.portals.len(),
            state.collectibles.len(),
            state.config.max_moves
        );
        self.state = state;
    }

    fn update(&mut self, dt: f32) {
        if !self.session.is_active() {
            return;
        }
        self.session.advance(dt);
        if self.state.phase != PlayState::Playing {
            return;
        }

        let events = step_physics(&mut self.state, dt);
        self.handle(events);

        if self.state.phase == PlayState::Playing {
            self.state.time_remaining -= dt;
            if self.state.time_remaining <= 0.0 {
                self.fail();
            }
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
