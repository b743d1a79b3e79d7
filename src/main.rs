//! Pocket Arcade entry point
//!
//! Headless runner: plays one level of a game with a scripted player and
//! prints the outcome. Useful for tuning the level tables.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use anyhow::{Context, Result, bail};
    use clap::Parser;
    use glam::Vec2;

    use pocket_arcade::consts::SIM_DT;
    use pocket_arcade::driver::FixedStep;
    use pocket_arcade::feedback::{Feedback, LogSink};
    use pocket_arcade::sim::gravity::TARGET_RADIUS;
    use pocket_arcade::sim::maze::shortest_path;
    use pocket_arcade::sim::{
        Cell, GravityDirection, GravityGame, LaneGame, MazeGame, ObjectKind, RhythmGame,
        SequenceGame,
    };
    use pocket_arcade::{GameId, MiniGame, Outcome, PlayState, ProgressBook, Settings};

    #[derive(Debug, Parser)]
    #[command(name = "pocket-arcade", version, about = "Play a level with a scripted player")]
    struct Cli {
        /// Game to run (tile-memory, momentum-catch, labyrinth, gravity-flux, chrono-cascade)
        game: GameId,

        /// Level to play (1-12)
        #[arg(short, long, default_value_t = 1)]
        level: u32,

        /// RNG seed for level generation
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Give up after this much simulated time
        #[arg(long, default_value_t = 180.0)]
        max_seconds: f32,

        /// Player settings JSON
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Progress book JSON to update with the result
        #[arg(long)]
        progress: Option<PathBuf>,
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let cli = Cli::parse();

        let settings = match &cli.settings {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Settings::from_json(&json)?
            }
            None => Settings::default(),
        };
        let feedback = Feedback::with_settings(LogSink, settings);

        log::info!(
            "Pocket Arcade: {} level {} (seed {})",
            cli.game,
            cli.level,
            cli.seed
        );

        let outcome = match cli.game {
            GameId::TileMemory => play(
                SequenceGame::new(cli.seed, feedback),
                &cli,
                sequence_player(),
            ),
            GameId::MomentumCatch => play(LaneGame::new(cli.seed, feedback), &cli, lane_player()),
            GameId::Labyrinth => play(MazeGame::new(cli.seed, feedback), &cli, maze_player()),
            GameId::GravityFlux => play(
                GravityGame::new(cli.seed, feedback),
                &cli,
                gravity_player(),
            ),
            GameId::ChronoCascade => play(
                RhythmGame::new(cli.seed, feedback),
                &cli,
                rhythm_player(),
            ),
        }?;

        println!(
            "{} level {}: {} with {} points, {} star(s)",
            cli.game,
            cli.level,
            if outcome.won { "cleared" } else { "failed" },
            outcome.score,
            outcome.stars
        );

        if let Some(path) = &cli.progress {
            update_progress(path, cli.game, cli.level, outcome)?;
        }
        Ok(())
    }

    /// Drive a game at a steady 60 Hz until its completion callback fires
    fn play<G: MiniGame>(
        mut game: G,
        cli: &Cli,
        mut player: impl FnMut(&mut G),
    ) -> Result<Outcome> {
        let reported = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&reported);
        game.set_on_complete(Box::new(move |outcome| {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(outcome);
            }
        }));
        game.start(cli.level);

        let mut step = FixedStep::new();
        let mut elapsed = 0.0;
        while elapsed < cli.max_seconds {
            player(&mut game);
            step.advance(&mut game, SIM_DT);
            elapsed += SIM_DT;

            let done = reported.lock().ok().and_then(|slot| *slot);
            if let Some(outcome) = done {
                game.teardown();
                return Ok(outcome);
            }
        }
        game.teardown();
        bail!(
            "{} level {} still {:?} after {}s",
            game.game(),
            cli.level,
            game.phase(),
            cli.max_seconds
        )
    }

    fn update_progress(path: &Path, game: GameId, level: u32, outcome: Outcome) -> Result<()> {
        let mut book = if path.exists() {
            let json =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            ProgressBook::from_json(&json)?
        } else {
            ProgressBook::new()
        };
        if book.record(game, level, outcome) {
            println!("New best!");
        }
        fs::write(path, book.to_json()?).with_context(|| format!("writing {}", path.display()))?;
        println!(
            "{} unlocked up to level {}, {} stars total",
            game,
            book.highest_unlocked(game),
            book.total_stars()
        );
        Ok(())
    }

    /// Repeats the shown sequence, one tile per tick
    fn sequence_player() -> impl FnMut(&mut SequenceGame) {
        |game: &mut SequenceGame| {
            let s = game.state();
            if s.phase != PlayState::Playing {
                return;
            }
            if let Some(&tile) = s.sequence.get(s.player_progress.len()) {
                game.tap(tile);
            }
        }
    }

    /// Catches whatever is in the zone, skipping danger orbs
    fn lane_player() -> impl FnMut(&mut LaneGame) {
        |game: &mut LaneGame| {
            let target = game
                .state()
                .objects
                .iter()
                .find(|o| o.in_target_zone() && o.kind != ObjectKind::Danger)
                .map(|o| o.id);
            if let Some(id) = target {
                game.tap(id);
            }
        }
    }

    /// Visits each collectible nearest-first, then heads for the exit
    fn maze_player() -> impl FnMut(&mut MazeGame) {
        let mut route: Vec<Cell> = Vec::new();
        let mut next = 0;
        move |game: &mut MazeGame| {
            let s = game.state();
            if s.phase != PlayState::Playing {
                return;
            }
            if route.is_empty() {
                route = plan_maze_route(game);
                next = 0;
            }
            if let Some(&cell) = route.get(next) {
                game.drag_to(cell);
                next += 1;
            }
        }
    }

    fn plan_maze_route(game: &MazeGame) -> Vec<Cell> {
        let s = game.state();
        let mut route = vec![s.start];
        let mut here = s.start;
        let mut pending: Vec<Cell> = s.collectibles.clone();
        while !pending.is_empty() {
            pending.sort_by_key(|c| std::cmp::Reverse(c.manhattan(here)));
            let Some(goal) = pending.pop() else { break };
            if let Some(leg) = shortest_path(&s.grid, here, goal) {
                route.extend(leg.into_iter().skip(1));
                here = goal;
            }
        }
        if let Some(leg) = shortest_path(&s.grid, here, s.end) {
            route.extend(leg.into_iter().skip(1));
        }
        route
    }

    /// Points gravity along the larger gap to the target, re-aiming a few
    /// times a second
    fn gravity_player() -> impl FnMut(&mut GravityGame) {
        let mut ticks = 0u32;
        move |game: &mut GravityGame| {
            ticks += 1;
            if ticks % 15 != 0 {
                return;
            }
            let s = game.state();
            let gap = s.target - s.pos;
            if gap.length() < TARGET_RADIUS {
                return;
            }
            let aim = if gap.x.abs() > TARGET_RADIUS && gap.y.abs() < 200.0 {
                Vec2::new(gap.x, 0.0)
            } else {
                gap
            };
            if let Some(direction) = GravityDirection::from_swipe(aim) {
                game.set_gravity(direction);
            }
        }
    }

    /// Taps whenever the sweep is on top of the next node
    fn rhythm_player() -> impl FnMut(&mut RhythmGame) {
        |game: &mut RhythmGame| {
            let s = game.state();
            if s.phase != PlayState::Playing || s.current_node >= s.nodes.len() {
                return;
            }
            let diff = (s.progress - s.target(s.current_node)).abs();
            if diff < s.config.perfect_window * 0.5 {
                game.tap();
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts embed the library directly on the web
}
