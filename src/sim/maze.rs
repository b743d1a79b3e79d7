//! Labyrinth engine
//!
//! A maze is carved by a random walk from the top-left corner to the
//! bottom-right corner, then roughened with extra openings so there is more
//! than one route. The player drags a path from the start to the exit before
//! the clock runs out, picking up collectibles on the way.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::session::{CompletionFn, Session};
use super::{MiniGame, Outcome, PlayState};
use crate::GameId;
use crate::feedback::{Cue, Feedback};
use crate::tuning::MazeConfig;

/// Chance that a carving step opens a backward wall instead of moving forward
pub const DETOUR_CHANCE: f64 = 0.3;
/// Placement attempts for collectibles before settling for fewer
pub const COLLECTIBLE_ATTEMPTS: u32 = 100;

pub const COLLECTIBLE_POINTS: u32 = 50;
pub const TIME_BONUS_PER_SECOND: u32 = 2;
pub const FULL_COLLECTION_BONUS: u32 = 100;

/// Grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn manhattan(&self, other: Cell) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    pub fn chebyshev(&self, other: Cell) -> u32 {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }

    /// Shares an edge with `other` (no diagonals)
    pub fn is_adjacent(&self, other: Cell) -> bool {
        self.manhattan(other) == 1
    }

    /// In-bounds edge neighbors on an `n x n` grid
    pub fn neighbors(&self, n: u32) -> impl Iterator<Item = Cell> + '_ {
        let (r, c) = (self.row as i64, self.col as i64);
        [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)]
            .into_iter()
            .filter(move |&(r, c)| r >= 0 && c >= 0 && r < n as i64 && c < n as i64)
            .map(|(r, c)| Cell::new(r as u32, c as u32))
    }
}

/// A maze cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Wall,
    Path,
}

/// Row-major square grid of tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeGrid {
    pub size: u32,
    pub tiles: Vec<Tile>,
}

impl MazeGrid {
    pub fn filled(size: u32) -> Self {
        Self {
            size,
            tiles: vec![Tile::Wall; (size * size) as usize],
        }
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.size && cell.col < self.size
    }

    pub fn tile(&self, cell: Cell) -> Option<Tile> {
        if !self.in_bounds(cell) {
            return None;
        }
        self.tiles
            .get((cell.row * self.size + cell.col) as usize)
            .copied()
    }

    pub fn is_path(&self, cell: Cell) -> bool {
        self.tile(cell) == Some(Tile::Path)
    }

    pub fn open(&mut self, cell: Cell) {
        if self.in_bounds(cell) {
            let idx = (cell.row * self.size + cell.col) as usize;
            self.tiles[idx] = Tile::Path;
        }
    }

    pub fn path_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.size)
            .flat_map(move |row| (0..self.size).map(move |col| Cell::new(row, col)))
            .filter(|c| self.is_path(*c))
    }

    /// Cells reachable from `from` over path tiles
    pub fn reachable(&self, from: Cell) -> BTreeSet<Cell> {
        let mut seen = BTreeSet::new();
        if !self.is_path(from) {
            return seen;
        }
        let mut stack = vec![from];
        seen.insert(from);
        while let Some(cell) = stack.pop() {
            for next in cell.neighbors(self.size) {
                if self.is_path(next) && seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen
    }
}

/// Carve a maze from the top-left to the bottom-right corner
pub fn generate_maze(size: u32, extra_openings: u32, rng: &mut impl Rng) -> MazeGrid {
    let size = size.max(2);
    let mut grid = MazeGrid::filled(size);
    let start = Cell::new(0, 0);
    let end = Cell::new(size - 1, size - 1);

    let step_cap = size * size * 8;
    let mut steps = 0;
    let mut current = start;
    grid.open(current);

    while current != end {
        steps += 1;
        let distance = current.manhattan(end);
        let neighbors: Vec<Cell> = current.neighbors(size).collect();
        let forward: Vec<Cell> = neighbors
            .iter()
            .copied()
            .filter(|n| n.manhattan(end) < distance)
            .collect();

        let mut next = forward[rng.random_range(0..forward.len())];
        if steps < step_cap && rng.random_bool(DETOUR_CHANCE) {
            let backward: Vec<Cell> = neighbors
                .iter()
                .copied()
                .filter(|n| n.manhattan(end) > distance && !grid.is_path(*n))
                .collect();
            if !backward.is_empty() {
                next = backward[rng.random_range(0..backward.len())];
            }
        }

        grid.open(next);
        current = next;
    }

    // Alternate routes
    for _ in 0..extra_openings {
        let cell = Cell::new(rng.random_range(0..size), rng.random_range(0..size));
        if !grid.is_path(cell) && cell.neighbors(size).any(|n| grid.is_path(n)) {
            grid.open(cell);
        }
    }

    grid
}

/// Snapshot of a labyrinth attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeState {
    pub config: MazeConfig,
    pub level: u32,
    pub phase: PlayState,
    pub grid: MazeGrid,
    pub start: Cell,
    pub end: Cell,
    pub collectibles: Vec<Cell>,
    pub collected: BTreeSet<Cell>,
    /// Route drawn so far, beginning at `start`
    pub current_path: Vec<Cell>,
    /// Cells uncovered by the fog so far this attempt
    pub revealed: BTreeSet<Cell>,
    pub time_remaining: f32,
    pub score: u32,
}

impl MazeState {
    pub fn new(level: u32) -> Self {
        let config = MazeConfig::for_level(level);
        let size = config.grid_size.max(2);
        Self {
            config,
            level,
            phase: PlayState::Ready,
            grid: MazeGrid::filled(size),
            start: Cell::new(0, 0),
            end: Cell::new(size - 1, size - 1),
            collectibles: Vec::new(),
            collected: BTreeSet::new(),
            current_path: Vec::new(),
            revealed: BTreeSet::new(),
            time_remaining: config.time_limit,
            score: 0,
        }
    }

    pub fn path_tip(&self) -> Option<Cell> {
        self.current_path.last().copied()
    }

    /// Where the fog is centered: the path tip, or the start
    pub fn fog_center(&self) -> Cell {
        self.path_tip().unwrap_or(self.start)
    }

    pub fn is_visible(&self, cell: Cell) -> bool {
        !self.config.fog
            || cell == self.start
            || cell == self.end
            || cell.chebyshev(self.fog_center()) <= self.config.fog_radius
            || self.revealed.contains(&cell)
    }

    pub fn all_collected(&self) -> bool {
        self.collected.len() == self.collectibles.len()
    }

    pub fn time_fraction(&self) -> f32 {
        if self.config.time_limit <= 0.0 {
            return 0.0;
        }
        (self.time_remaining / self.config.time_limit).clamp(0.0, 1.0)
    }

    fn reveal_around_tip(&mut self) {
        if !self.config.fog {
            return;
        }
        let center = self.fog_center();
        let r = self.config.fog_radius;
        let n = self.grid.size;
        let rows = center.row.saturating_sub(r)..=(center.row + r).min(n - 1);
        for row in rows {
            for col in center.col.saturating_sub(r)..=(center.col + r).min(n - 1) {
                self.revealed.insert(Cell::new(row, col));
            }
        }
    }
}

/// Stars from collection and time left
pub fn star_rating(all_collected: bool, time_fraction: f32) -> u8 {
    if all_collected && time_fraction > 0.5 {
        3
    } else if all_collected || time_fraction > 0.3 {
        2
    } else {
        1
    }
}

/// Labyrinth engine
#[derive(Debug)]
pub struct MazeGame {
    state: MazeState,
    session: Session<()>,
    rng: Pcg32,
}

impl MazeGame {
    pub fn new(seed: u64, feedback: Feedback) -> Self {
        Self {
            state: MazeState::new(1),
            session: Session::new(feedback),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &MazeState {
        &self.state
    }

    fn place_collectibles(&mut self) {
        let wanted = self.state.config.collectible_count as usize;
        let n = self.state.grid.size;
        let mut placed: Vec<Cell> = Vec::with_capacity(wanted);
        let mut attempts = 0;
        while placed.len() < wanted && attempts < COLLECTIBLE_ATTEMPTS {
            attempts += 1;
            let cell = Cell::new(self.rng.random_range(0..n), self.rng.random_range(0..n));
            if cell != self.state.start
                && cell != self.state.end
                && self.state.grid.is_path(cell)
                && !placed.contains(&cell)
            {
                placed.push(cell);
            }
        }
        if placed.len() < wanted {
            log::debug!(
                "placed {} of {} collectibles after {} attempts",
                placed.len(),
                wanted,
                attempts
            );
        }
        self.state.collectibles = placed;
    }

    /// Extend (or trim) the drawn path to `cell`. Returns true if the path changed.
    pub fn drag_to(&mut self, cell: Cell) -> bool {
        if !self.session.is_active() || self.state.phase != PlayState::Playing {
            return false;
        }
        if !self.state.grid.is_path(cell) {
            return false;
        }

        let Some(tip) = self.state.path_tip() else {
            if cell != self.state.start {
                return false;
            }
            self.state.current_path.push(cell);
            self.state.reveal_around_tip();
            return true;
        };

        if cell == tip {
            return false;
        }
        // Backtracking trims the path back to the revisited cell
        if let Some(i) = self.state.current_path.iter().position(|c| *c == cell) {
            self.state.current_path.truncate(i + 1);
            self.state.reveal_around_tip();
            return true;
        }
        if !tip.is_adjacent(cell) {
            return false;
        }

        self.state.current_path.push(cell);
        self.state.reveal_around_tip();
        if self.state.collectibles.contains(&cell) && self.state.collected.insert(cell) {
            self.state.score += COLLECTIBLE_POINTS;
            self.session.emit(Cue::Collect);
        }
        if cell == self.state.end {
            self.complete();
        }
        true
    }

    /// Drag expressed in board coordinates (origin at the top-left)
    pub fn drag_to_point(&mut self, point: Vec2, cell_size: f32) -> bool {
        if cell_size <= 0.0 || point.x < 0.0 || point.y < 0.0 {
            return false;
        }
        let cell = Cell::new(
            (point.y / cell_size).floor() as u32,
            (point.x / cell_size).floor() as u32,
        );
        self.drag_to(cell)
    }

    /// Finger lifted. Short of the exit, the route is wiped.
    pub fn release(&mut self) -> bool {
        if !self.session.is_active() || self.state.phase != PlayState::Playing {
            return false;
        }
        if self.state.path_tip() != Some(self.state.end) && !self.state.current_path.is_empty() {
            self.state.current_path.clear();
            self.state.reveal_around_tip();
            self.session.emit(Cue::Error);
        }
        true
    }

    fn complete(&mut self) {
        let s = &mut self.state;
        s.phase = PlayState::Success;
        s.score += s.time_remaining.max(0.0) as u32 * TIME_BONUS_PER_SECOND;
        if !s.collectibles.is_empty() && s.all_collected() {
            s.score += FULL_COLLECTION_BONUS;
        }
        let stars = star_rating(s.all_collected(), s.time_fraction());
        let outcome = Outcome::new(s.score, stars, true);
        self.session.conclude(outcome);
    }

    fn fail(&mut self) {
        let s = &mut self.state;
        s.time_remaining = 0.0;
        s.phase = PlayState::Failed;
        let stars = star_rating(s.all_collected(), 0.0);
        let outcome = Outcome::new(s.score, stars, false);
        self.session.conclude(outcome);
    }
}

impl MiniGame for MazeGame {
    fn game(&self) -> GameId {
        GameId::Labyrinth
    }

    fn level(&self) -> u32 {
        self.state.level
    }

    fn start(&mut self, level: u32) {
        self.session.restart();
        let mut state = MazeState::new(level);
        state.grid = generate_maze(state.grid.size, state.config.extra_openings, &mut self.rng);
        self.state = state;
        self.place_collectibles();
        self.state.reveal_around_tip();
        self.state.phase = PlayState::Playing;
        log::info!(
            "labyrinth level {}: {}x{}, {} collectibles, fog={}",
            level,
            self.state.grid.size,
            self.state.grid.size,
            self.state.collectibles.len(),
            self.state.config.fog
        );
    }

    fn update(&mut self, dt: f32) {
        if !self.session.is_active() {
            return;
        }
        self.session.advance(dt);
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

/// Shortest route over path tiles, used by bots and hints
pub fn shortest_path(grid: &MazeGrid, from: Cell, to: Cell) -> Option<Vec<Cell>> {
    use std::collections::{BTreeMap, VecDeque};

    if !grid.is_path(from) || !grid.is_path(to) {
        return None;
    }
    let mut came_from: BTreeMap<Cell, Cell> = BTreeMap::new();
    let mut queue = VecDeque::from([from]);
    let mut seen = BTreeSet::from([from]);
    while let Some(cell) = queue.pop_front() {
        if cell == to {
            let mut route = vec![to];
            let mut cur = to;
            while let Some(prev) = came_from.get(&cur) {
                route.push(*prev);
                cur = *prev;
            }
            route.reverse();
            return Some(route);
        }
        for next in cell.neighbors(grid.size) {
            if grid.is_path(next) && seen.insert(next) {
                came_from.insert(next, cell);
                queue.push_back(next);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::feedback::RecordingSink;

    fn started(level: u32, seed: u64) -> (MazeGame, RecordingSink) {
        let sink = RecordingSink::new();
        let mut game = MazeGame::new(seed, Feedback::new(sink.clone()));
        game.start(level);
        (game, sink)
    }

    fn solution(game: &MazeGame) -> Vec<Cell> {
        let s = game.state();
        shortest_path(&s.grid, s.start, s.end).unwrap()
    }

    #[test]
    fn test_generated_maze_connects_start_to_end() {
        let mut rng = Pcg32::seed_from_u64(1);
        for level in 1..=12 {
            let cfg = MazeConfig::for_level(level);
            let grid = generate_maze(cfg.grid_size, cfg.extra_openings, &mut rng);
            let n = cfg.grid_size;
            let reach = grid.reachable(Cell::new(0, 0));
            assert!(reach.contains(&Cell::new(n - 1, n - 1)), "level {level}");
            // Every opened cell hangs off the carved route
            assert_eq!(reach.len(), grid.path_cells().count());
        }
    }

    #[test]
    fn test_collectibles_on_path_and_not_on_endpoints() {
        for seed in 0..20 {
            let (game, _) = started(12, seed);
            let s = game.state();
            assert!(s.collectibles.len() <= s.config.collectible_count as usize);
            for c in &s.collectibles {
                assert!(s.grid.is_path(*c));
                assert_ne!(*c, s.start);
                assert_ne!(*c, s.end);
            }
            let unique: BTreeSet<_> = s.collectibles.iter().collect();
            assert_eq!(unique.len(), s.collectibles.len());
        }
    }

    #[test]
    fn test_drag_must_begin_at_start() {
        let (mut game, _) = started(1, 3);
        let route = solution(&game);
        assert!(!game.drag_to(route[1]));
        assert!(game.drag_to(route[0]));
        assert!(game.drag_to(route[1]));
        assert_eq!(game.state().current_path, route[..2].to_vec());
    }

    #[test]
    fn test_drag_rejects_walls_and_jumps() {
        let (mut game, _) = started(1, 4);
        game.drag_to(Cell::new(0, 0));
        let wall = game
            .state()
            .grid
            .tiles
            .iter()
            .position(|t| *t == Tile::Wall)
            .map(|i| Cell::new(i as u32 / 7, i as u32 % 7))
            .unwrap();
        assert!(!game.drag_to(wall));
        assert!(!game.drag_to(Cell::new(6, 6)));
        assert!(!game.drag_to(Cell::new(40, 40)));
        assert_eq!(game.state().current_path.len(), 1);
    }

    #[test]
    fn test_backtracking_truncates() {
        let (mut game, _) = started(1, 5);
        let route = solution(&game);
        for cell in &route[..4] {
            game.drag_to(*cell);
        }
        assert!(game.drag_to(route[1]));
        assert_eq!(game.state().current_path, route[..2].to_vec());
    }

    #[test]
    fn test_release_short_of_exit_clears_path() {
        let (mut game, sink) = started(1, 6);
        let route = solution(&game);
        game.drag_to(route[0]);
        game.drag_to(route[1]);
        assert!(game.release());
        assert!(game.state().current_path.is_empty());
        assert_eq!(sink.count(Cue::Error), 1);
        assert_eq!(game.phase(), PlayState::Playing);
    }

    #[test]
    fn test_reaching_exit_scores_and_succeeds() {
        let (mut game, sink) = started(1, 8);
        game.state.grid = MazeGrid {
            size: 7,
            tiles: vec![Tile::Path; 49],
        };
        game.state.collectibles = vec![Cell::new(0, 3), Cell::new(3, 3)];
        game.state.collected.clear();

        let route = [
            (0, 0), (0, 1), (0, 2), (0, 3), (1, 3), (2, 3), (3, 3),
            (4, 3), (5, 3), (6, 3), (6, 4), (6, 5), (6, 6),
        ];
        for (row, col) in route {
            assert!(game.drag_to(Cell::new(row, col)));
        }

        assert_eq!(game.phase(), PlayState::Success);
        assert!(game.state().all_collected());
        let expected = 2 * COLLECTIBLE_POINTS + 60 * TIME_BONUS_PER_SECOND + FULL_COLLECTION_BONUS;
        assert_eq!(game.score(), expected);
        assert_eq!(game.outcome().unwrap().stars, 3);
        assert_eq!(sink.count(Cue::Collect), 2);
        assert!(!game.drag_to(Cell::new(6, 5)));
    }

    #[test]
    fn test_exit_without_collectibles_gets_two_stars_at_most() {
        let (mut game, _) = started(1, 8);
        game.state.grid = MazeGrid {
            size: 7,
            tiles: vec![Tile::Path; 49],
        };
        game.state.collectibles = vec![Cell::new(0, 6)];
        game.drag_to(Cell::new(0, 0));
        for row in 1..7 {
            game.drag_to(Cell::new(row, 0));
        }
        for col in 1..7 {
            game.drag_to(Cell::new(6, col));
        }
        assert_eq!(game.phase(), PlayState::Success);
        assert_eq!(game.score(), 60 * TIME_BONUS_PER_SECOND);
        assert_eq!(game.outcome().unwrap().stars, 2);
    }

    #[test]
    fn test_timer_runs_out() {
        let (mut game, _) = started(1, 9);
        for _ in 0..(61 * 60) {
            game.update(SIM_DT);
        }
        assert_eq!(game.phase(), PlayState::Failed);
        assert_eq!(game.state().time_remaining, 0.0);
        assert!(!game.drag_to(Cell::new(0, 0)));
    }

    #[test]
    fn test_fog_reveals_monotonically() {
        let (mut game, _) = started(5, 10);
        assert!(game.state().config.fog);
        assert!(!game.state().is_visible(Cell::new(5, 0)));
        assert!(game.state().is_visible(game.state().end));

        let route = solution(&game);
        let mut before = game.state().revealed.len();
        for cell in &route[..route.len() - 1] {
            game.drag_to(*cell);
            let now = game.state().revealed.len();
            assert!(now >= before);
            before = now;
        }
        let revealed = game.state().revealed.clone();
        game.release();
        assert!(revealed.is_subset(&game.state().revealed));
    }

    #[test]
    fn test_no_fog_everything_visible() {
        let (game, _) = started(1, 11);
        assert!(game.state().is_visible(Cell::new(3, 5)));
    }

    #[test]
    fn test_star_rating() {
        assert_eq!(star_rating(true, 0.6), 3);
        assert_eq!(star_rating(true, 0.2), 2);
        assert_eq!(star_rating(false, 0.4), 2);
        assert_eq!(star_rating(false, 0.3), 1);
    }

    #[test]
    fn test_drag_to_point_maps_cells() {
        let (mut game, _) = started(1, 12);
        assert!(game.drag_to_point(Vec2::new(10.0, 10.0), 40.0));
        assert_eq!(game.state().current_path, vec![Cell::new(0, 0)]);
        assert!(!game.drag_to_point(Vec2::new(-1.0, 10.0), 40.0));
    }
}
