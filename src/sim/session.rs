//! Per-engine runtime plumbing
//!
//! Everything an engine needs that is not simulation state: the delayed
//! effect queue, the feedback front, and the completion callback. Keeping it
//! out of the state structs leaves those plain, cloneable and serializable.

use super::timers::{TimerHandle, Timers};
use super::Outcome;
use crate::consts::COMPLETION_DELAY;
use crate::feedback::{Cue, Feedback};

/// Callback receiving the result of a level attempt
pub type CompletionFn = Box<dyn FnMut(Outcome) + Send>;

#[derive(Debug, Clone)]
enum Scheduled<E> {
    Complete,
    Game(E),
}

/// Runtime shared by every engine, generic over the engine's own effects
pub struct Session<E> {
    timers: Timers<Scheduled<E>>,
    feedback: Feedback,
    on_complete: Option<CompletionFn>,
    outcome: Option<Outcome>,
    reported: bool,
    active: bool,
}

impl<E> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pending", &self.timers.len())
            .field("outcome", &self.outcome)
            .field("reported", &self.reported)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl<E> Session<E> {
    pub fn new(feedback: Feedback) -> Self {
        Self {
            timers: Timers::new(),
            feedback,
            on_complete: None,
            outcome: None,
            reported: false,
            active: false,
        }
    }

    /// Begin a fresh attempt, dropping anything queued by the previous one
    pub fn restart(&mut self) {
        self.timers.clear();
        self.outcome = None;
        self.reported = false;
        self.active = true;
    }

    /// Stop for good: nothing queued will fire and the callback is released
    pub fn teardown(&mut self) {
        self.timers.clear();
        self.on_complete = None;
        self.active = false;
    }

    /// False before the first start and after teardown
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_on_complete(&mut self, callback: CompletionFn) {
        self.on_complete = Some(callback);
    }

    pub fn emit(&mut self, cue: Cue) {
        self.feedback.emit(cue);
    }

    pub fn schedule(&mut self, delay: f32, effect: E) -> TimerHandle {
        self.timers.schedule(delay, Scheduled::Game(effect))
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.cancel(handle)
    }

    /// Drop engine effects matching the predicate (completion is kept)
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&E) -> bool) {
        self.timers.cancel_where(|s| match s {
            Scheduled::Game(e) => pred(e),
            Scheduled::Complete => false,
        });
    }

    /// Result of the current attempt, once it has ended
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether the completion callback already ran for this attempt
    pub fn reported(&self) -> bool {
        self.reported
    }

    /// Record the end of the attempt. Only the first call per attempt counts.
    pub fn conclude(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_some() || !self.active {
            return false;
        }
        log::info!(
            "attempt over: won={} score={} stars={}",
            outcome.won,
            outcome.score,
            outcome.stars
        );
        self.outcome = Some(outcome);
        self.emit(if outcome.won {
            Cue::LevelComplete
        } else {
            Cue::LevelFailed
        });
        self.timers.schedule(COMPLETION_DELAY, Scheduled::Complete);
        true
    }

    /// Advance the clock. Returns due engine effects; the completion
    /// callback is run here when its delay elapses.
    pub fn advance(&mut self, dt: f32) -> Vec<E> {
        if !self.active {
            return Vec::new();
        }
        let mut effects = Vec::new();
        for scheduled in self.timers.advance(dt) {
            match scheduled {
                Scheduled::Game(e) => effects.push(e),
                Scheduled::Complete => self.report(),
            }
        }
        effects
    }

    fn report(&mut self) {
        if self.reported {
            return;
        }
        let Some(outcome) = self.outcome else { return };
        self.reported = true;
        if let Some(callback) = self.on_complete.as_mut() {
            callback(outcome);
        }
    }
}
