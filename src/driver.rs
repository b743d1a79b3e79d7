//! Host loop helpers
//!
//! Hosts hand over wall-clock frame times; engines only ever see `SIM_DT`.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::sim::{CompletionFn, MiniGame, Outcome};

/// Fixed-timestep accumulator
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedStep {
    accumulator: f32,
}

impl FixedStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsimulated time carried to the next frame
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Feed one frame of wall-clock time. Returns the number of ticks run.
    pub fn advance<G: MiniGame + ?Sized>(&mut self, game: &mut G, frame_dt: f32) -> u32 {
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            game.update(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }
}

/// An engine shared between an input thread and a tick thread
///
/// Every input, tick and teardown goes through the same lock, so a teardown
/// can never interleave with a tick in flight. Completion callbacks set
/// through the handle run after the lock is released and may call back into
/// it, e.g. to start the next level.
pub struct SharedGame<G> {
    inner: Arc<Mutex<G>>,
    finished: Arc<Mutex<Vec<Outcome>>>,
    callback: Arc<Mutex<CallbackSlot>>,
}

/// Host callback plus a counter bumped whenever it is replaced or dropped
#[derive(Default)]
struct CallbackSlot {
    callback: Option<CompletionFn>,
    epoch: u64,
}

impl<G> std::fmt::Debug for SharedGame<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGame")
            .field("pending", &lock(&self.finished).len())
            .finish_non_exhaustive()
    }
}

impl<G> Clone for SharedGame<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            finished: Arc::clone(&self.finished),
            callback: Arc::clone(&self.callback),
        }
    }
}

/// A panicked holder leaves plain data behind; keep going with it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<G: MiniGame> SharedGame<G> {
    pub fn new(game: G) -> Self {
        Self {
            inner: Arc::new(Mutex::new(game)),
            finished: Arc::new(Mutex::new(Vec::new())),
            callback: Arc::new(Mutex::new(CallbackSlot::default())),
        }
    }

    /// Run `f` with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        let result = f(&mut lock(&self.inner));
        self.deliver();
        result
    }

    /// One host frame under the lock
    pub fn tick(&self, step: &mut FixedStep, frame_dt: f32) -> u32 {
        let ticks = step.advance(&mut *lock(&self.inner), frame_dt);
        self.deliver();
        ticks
    }

    pub fn start(&self, level: u32) {
        lock(&self.inner).start(level);
    }

    pub fn teardown(&self) {
        lock(&self.inner).teardown();
        lock(&self.finished).clear();
        let mut slot = lock(&self.callback);
        slot.callback = None;
        slot.epoch += 1;
    }

    /// Register the completion callback. The engine only queues the outcome;
    /// `callback` runs once the engine lock is free again.
    pub fn set_on_complete(&self, callback: CompletionFn) {
        {
            let mut slot = lock(&self.callback);
            slot.callback = Some(callback);
            slot.epoch += 1;
        }
        let finished = Arc::clone(&self.finished);
        lock(&self.inner).set_on_complete(Box::new(move |outcome| {
            lock(&finished).push(outcome);
        }));
    }

    /// Hand queued outcomes to the host callback
    fn deliver(&self) {
        let outcomes = std::mem::take(&mut *lock(&self.finished));
        if outcomes.is_empty() {
            return;
        }
        let (mut callback, epoch) = {
            let mut slot = lock(&self.callback);
            match slot.callback.take() {
                Some(callback) => (callback, slot.epoch),
                None => return,
            }
        };
        for outcome in outcomes {
            callback(outcome);
        }
        // Put it back unless it was replaced or torn down meanwhile
        let mut slot = lock(&self.callback);
        if slot.epoch == epoch && slot.callback.is_none() {
            slot.callback = Some(callback);
        }
    }
}
