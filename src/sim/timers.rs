//! Cancellable delayed effects
//!
//! Delays run on simulated time: they only advance when the owning engine
//! is updated. Clearing the queue on restart/teardown guarantees nothing
//! scheduled for an old round can touch the new one.

/// Identifies a scheduled effect so it can be cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Pending<E> {
    id: u64,
    due: f32,
    effect: E,
}

/// Queue of effects due at a point in simulated time
#[derive(Debug, Clone)]
pub struct Timers<E> {
    now: f32,
    next_id: u64,
    pending: Vec<Pending<E>>,
}

impl<E> Default for Timers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Timers<E> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_id: 1,
            pending: Vec::new(),
        }
    }

    /// Simulated seconds since the queue was created or last cleared
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Schedule `effect` to fire `delay` seconds from now
    pub fn schedule(&mut self, delay: f32, effect: E) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due: self.now + delay.max(0.0),
            effect,
        });
        TimerHandle(id)
    }

    /// Cancel one effect. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != handle.0);
        self.pending.len() != before
    }

    /// Cancel every pending effect matching the predicate
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&E) -> bool) {
        self.pending.retain(|p| !pred(&p.effect));
    }

    /// Drop everything and restart the clock
    pub fn clear(&mut self) {
        self.pending.clear();
        self.now = 0.0;
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.id == handle.0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advance the clock and take every effect that is now due, earliest
    /// first (ties keep scheduling order)
    pub fn advance(&mut self, dt: f32) -> Vec<E> {
        self.now += dt.max(0.0);
        let now = self.now;
        if !self.pending.iter().any(|p| p.due <= now) {
            return Vec::new();
        }

        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = rest;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)));
        due.into_iter().map(|p| p.effect).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_fire_in_due_order() {
        let mut timers = Timers::new();
        timers.schedule(0.3, "late");
        timers.schedule(0.1, "early");
        timers.schedule(0.1, "early-second");

        assert!(timers.advance(0.05).is_empty());
        assert_eq!(timers.advance(0.1), vec!["early", "early-second"]);
        assert_eq!(timers.advance(0.2), vec!["late"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancelled_effect_never_fires() {
        let mut timers = Timers::new();
        let keep = timers.schedule(0.5, 1);
        let drop = timers.schedule(0.5, 2);
        assert!(timers.cancel(drop));
        assert!(!timers.cancel(drop));
        assert!(timers.is_pending(keep));
        assert_eq!(timers.advance(1.0), vec![1]);
    }

    #[test]
    fn test_cancel_where_and_clear() {
        let mut timers = Timers::new();
        timers.schedule(0.1, 10);
        timers.schedule(0.1, 11);
        timers.schedule(0.1, 20);
        timers.cancel_where(|e| *e < 20);
        assert_eq!(timers.len(), 1);

        timers.clear();
        assert_eq!(timers.now(), 0.0);
        assert!(timers.advance(5.0).is_empty());
    }

    #[test]
    fn test_delay_is_relative_to_current_time() {
        let mut timers = Timers::new();
        timers.advance(2.0);
        timers.schedule(0.5, ());
        assert!(timers.advance(0.4).is_empty());
        assert_eq!(timers.advance(0.1 + 1e-4).len(), 1);
    }
}
