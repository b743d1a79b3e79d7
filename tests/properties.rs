//! Property tests for the simulation engines.
//!
//! Random seeds, levels and input sequences are thrown at each engine and
//! the invariants are checked after every step.

use glam::Vec2;
use pocket_arcade::consts::{LEVEL_COUNT, SIM_DT};
use pocket_arcade::feedback::Feedback;
use pocket_arcade::sim::gravity::{
    ARENA_HEIGHT, ARENA_WIDTH, ORB_RADIUS, generate_layout, step_physics,
};
use pocket_arcade::sim::lanes::ObjectKind;
use pocket_arcade::sim::{
    Cell, GravityDirection, GravityState, LaneGame, MazeGame, RhythmGame, SequenceGame,
};
use pocket_arcade::tuning::{GravityConfig, LaneConfig, MazeConfig, RhythmConfig, SequenceConfig};
use pocket_arcade::{MiniGame, PlayState};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Inputs a maze player can produce.
#[derive(Debug, Clone)]
enum MazeOp {
    Drag(u32, u32),
    Release,
    Tick,
}

fn maze_op_strategy() -> impl Strategy<Value = MazeOp> {
    prop_oneof![
        6 => (0..16u32, 0..16u32).prop_map(|(r, c)| MazeOp::Drag(r, c)),
        1 => Just(MazeOp::Release),
        1 => Just(MazeOp::Tick),
    ]
}

fn direction_strategy() -> impl Strategy<Value = GravityDirection> {
    prop_oneof![
        Just(GravityDirection::Up),
        Just(GravityDirection::Down),
        Just(GravityDirection::Left),
        Just(GravityDirection::Right),
    ]
}

/// Velocities far beyond anything gravity alone produces.
fn wild_f32() -> impl Strategy<Value = f32> {
    (-100_000i32..100_000i32).prop_map(|v| v as f32 * 0.1)
}

proptest! {
    #[test]
    fn configs_fall_back_to_level_one(
        level in prop_oneof![Just(0u32), (LEVEL_COUNT + 1)..u32::MAX],
    ) {
        prop_assert_eq!(SequenceConfig::for_level(level), SequenceConfig::for_level(1));
        prop_assert_eq!(LaneConfig::for_level(level), LaneConfig::for_level(1));
        prop_assert_eq!(MazeConfig::for_level(level), MazeConfig::for_level(1));
        prop_assert_eq!(GravityConfig::for_level(level), GravityConfig::for_level(1));
        prop_assert_eq!(RhythmConfig::for_level(level), RhythmConfig::for_level(1));
    }

    #[test]
    fn sequences_are_distinct_and_avoid_obstacles(seed in any::<u64>(), level in 1..=LEVEL_COUNT) {
        let mut game = SequenceGame::new(seed, Feedback::default());
        game.start(level);
        for _ in 0..5 {
            let sequence = game.generate_sequence().to_vec();
            let s = game.state();
            prop_assert!(sequence.len() <= s.target_length());
            let mut seen = std::collections::BTreeSet::new();
            for tile in &sequence {
                prop_assert!(*tile < s.config.tile_count());
                prop_assert!(!s.obstacles.contains(tile));
                prop_assert!(seen.insert(*tile));
            }
        }
    }

    #[test]
    fn orb_stays_inside_arena(
        seed in any::<u64>(),
        level in 1..=LEVEL_COUNT,
        x in 0.0f32..ARENA_WIDTH,
        y in 0.0f32..ARENA_HEIGHT,
        vx in wild_f32(),
        vy in wild_f32(),
        directions in prop::collection::vec(direction_strategy(), 1..8),
    ) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut state = GravityState::new(level);
        generate_layout(&mut state, &mut rng);
        state.pos = Vec2::new(x, y);
        state.vel = Vec2::new(vx, vy);

        for direction in directions {
            state.gravity = direction;
            for _ in 0..60 {
                step_physics(&mut state, SIM_DT);
                prop_assert!(state.pos.x >= ORB_RADIUS && state.pos.x <= ARENA_WIDTH - ORB_RADIUS);
                prop_assert!(state.pos.y >= ORB_RADIUS && state.pos.y <= ARENA_HEIGHT - ORB_RADIUS);
            }
        }
    }

    #[test]
    fn maze_path_stays_valid(
        seed in any::<u64>(),
        level in 1..=LEVEL_COUNT,
        ops in prop::collection::vec(maze_op_strategy(), 1..200),
    ) {
        let mut game = MazeGame::new(seed, Feedback::default());
        game.start(level);

        for op in ops {
            match op {
                MazeOp::Drag(r, c) => {
                    game.drag_to(Cell::new(r, c));
                }
                MazeOp::Release => {
                    game.release();
                }
                MazeOp::Tick => game.update(SIM_DT),
            }

            let s = game.state();
            if let Some(first) = s.current_path.first() {
                prop_assert_eq!(*first, s.start);
            }
            for pair in s.current_path.windows(2) {
                prop_assert!(pair[0].is_adjacent(pair[1]));
            }
            let distinct: std::collections::BTreeSet<_> = s.current_path.iter().collect();
            prop_assert_eq!(distinct.len(), s.current_path.len());
            for cell in &s.current_path {
                prop_assert!(s.grid.is_path(*cell));
            }
        }
    }

    #[test]
    fn rhythm_fails_on_the_limiting_miss(
        seed in any::<u64>(),
        level in 1..=LEVEL_COUNT,
        taps in prop::collection::vec(any::<bool>(), 1..2000),
    ) {
        let mut game = RhythmGame::new(seed, Feedback::default());
        game.start(level);
        let limit = game.state().miss_limit();

        for tap in taps {
            if tap {
                game.tap();
            } else {
                game.update(SIM_DT);
            }
            if game.state().miss_count >= limit {
                prop_assert_eq!(game.phase(), PlayState::Failed);
            }
            if game.phase().is_terminal() {
                break;
            }
        }
    }

    #[test]
    fn lane_combo_decays_after_quiet_spell(seed in any::<u64>(), level in 1..=LEVEL_COUNT) {
        let mut game = LaneGame::new(seed, Feedback::default());
        game.start(level);

        // Catch the first safe orb that reaches the zone
        let mut caught = false;
        for _ in 0..600 {
            game.update(SIM_DT);
            let target = game
                .state()
                .objects
                .iter()
                .find(|o| o.in_target_zone() && o.kind != ObjectKind::Danger)
                .map(|o| o.id);
            if let Some(id) = target {
                caught = game.tap(id);
                if caught {
                    break;
                }
            }
        }
        prop_assume!(caught && game.phase() == PlayState::Playing);

        for _ in 0..130 {
            game.update(SIM_DT);
        }
        prop_assume!(game.phase() == PlayState::Playing);
        prop_assert_eq!(game.state().combo, 0);
        prop_assert_eq!(game.state().multiplier, 1.0);
    }
}
