//! Best records and level unlocks
//!
//! One book per player, keyed by game. The host feeds it outcomes from the
//! completion callback and stores the JSON wherever it likes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::GameId;
use crate::consts::LEVEL_COUNT;
use crate::error::Result;
use crate::sim::Outcome;

/// Best result on a single level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelRecord {
    pub best_score: u32,
    /// 0 until the level has been won
    pub best_stars: u8,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameProgress {
    /// Never decreases
    pub highest_unlocked: u32,
    pub levels: BTreeMap<u32, LevelRecord>,
}

impl Default for GameProgress {
    fn default() -> Self {
        Self {
            highest_unlocked: 1,
            levels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressBook {
    pub games: BTreeMap<GameId, GameProgress>,
}

impl ProgressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished attempt into the book. Returns true if it set a
    /// new best score.
    pub fn record(&mut self, game: GameId, level: u32, outcome: Outcome) -> bool {
        if !(1..=LEVEL_COUNT).contains(&level) {
            log::warn!("ignoring {} result for level {}", game, level);
            return false;
        }
        let progress = self.games.entry(game).or_default();
        let record = progress.levels.entry(level).or_default();

        let new_best = outcome.score > record.best_score;
        record.best_score = record.best_score.max(outcome.score);
        if outcome.won {
            record.completed = true;
            record.best_stars = record.best_stars.max(outcome.stars);
            let next = (level + 1).min(LEVEL_COUNT);
            if next > progress.highest_unlocked {
                log::info!("{} level {} unlocked", game, next);
                progress.highest_unlocked = next;
            }
        }
        new_best
    }

    pub fn is_unlocked(&self, game: GameId, level: u32) -> bool {
        level >= 1 && level <= self.highest_unlocked(game)
    }

    pub fn highest_unlocked(&self, game: GameId) -> u32 {
        self.games.get(&game).map_or(1, |p| p.highest_unlocked.max(1))
    }

    pub fn record_for(&self, game: GameId, level: u32) -> Option<&LevelRecord> {
        self.games.get(&game).and_then(|p| p.levels.get(&level))
    }

    /// Stars earned across every game
    pub fn total_stars(&self) -> u32 {
        self.games
            .values()
            .flat_map(|p| p.levels.values())
            .map(|r| r.best_stars as u32)
            .sum()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let book: ProgressBook = serde_json::from_str(json)?;
        log::info!("Loaded progress for {} games", book.games.len());
        Ok(book)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_unlocks_next_level() {
        let mut book = ProgressBook::new();
        assert!(book.is_unlocked(GameId::Labyrinth, 1));
        assert!(!book.is_unlocked(GameId::Labyrinth, 2));

        book.record(GameId::Labyrinth, 1, Outcome::new(300, 2, true));
        assert!(book.is_unlocked(GameId::Labyrinth, 2));
        assert!(!book.is_unlocked(GameId::Labyrinth, 3));
        // Other games are untouched
        assert!(!book.is_unlocked(GameId::GravityFlux, 2));
    }

    #[test]
    fn test_loss_keeps_score_but_not_stars() {
        let mut book = ProgressBook::new();
        assert!(book.record(GameId::ChronoCascade, 1, Outcome::new(120, 1, false)));
        let record = book.record_for(GameId::ChronoCascade, 1).unwrap();
        assert_eq!(record.best_score, 120);
        assert_eq!(record.best_stars, 0);
        assert!(!record.completed);
        assert_eq!(book.highest_unlocked(GameId::ChronoCascade), 1);
    }

    #[test]
    fn test_best_records_only_improve() {
        let mut book = ProgressBook::new();
        book.record(GameId::TileMemory, 2, Outcome::new(400, 3, true));
        assert!(!book.record(GameId::TileMemory, 2, Outcome::new(250, 1, true)));
        let record = book.record_for(GameId::TileMemory, 2).unwrap();
        assert_eq!(record.best_score, 400);
        assert_eq!(record.best_stars, 3);
    }

    #[test]
    fn test_unlocks_are_monotonic_and_capped() {
        let mut book = ProgressBook::new();
        book.record(GameId::MomentumCatch, 12, Outcome::new(50, 1, true));
        assert_eq!(book.highest_unlocked(GameId::MomentumCatch), 12);
        book.record(GameId::MomentumCatch, 3, Outcome::new(50, 1, true));
        assert_eq!(book.highest_unlocked(GameId::MomentumCatch), 12);
    }

    #[test]
    fn test_out_of_range_levels_ignored() {
        let mut book = ProgressBook::new();
        assert!(!book.record(GameId::Labyrinth, 0, Outcome::new(10, 1, true)));
        assert!(!book.record(GameId::Labyrinth, 13, Outcome::new(10, 1, true)));
        assert!(book.games.is_empty());
    }

    #[test]
    fn test_total_stars_and_json() {
        let mut book = ProgressBook::new();
        book.record(GameId::Labyrinth, 1, Outcome::new(300, 2, true));
        book.record(GameId::GravityFlux, 1, Outcome::new(200, 3, true));
        assert_eq!(book.total_stars(), 5);

        let json = book.to_json().unwrap();
        assert!(json.contains("gravity-flux"));
        let loaded = ProgressBook::from_json(&json).unwrap();
        assert_eq!(loaded, book);
        assert!(ProgressBook::from_json("{").is_err());
        assert_eq!(ProgressBook::from_json("{}").unwrap(), ProgressBook::new());
    }
}
