//! Adaptive producer backoff for overloaded queues.
//!
//! The first overloaded push waits `base`. Every later overloaded push that
//! finds the queue longer than last time waits one `step` more; one that finds
//! it the same size or shorter waits one `step` less, never below `base`.

use std::time::Duration;

/// Per-queue delay state used while a queue sits above its capacity.
#[derive(Debug, Clone)]
pub struct AdaptiveBackoff {
    base: Duration,
    step: Duration,
    current: Duration,
    last_len: Option<usize>,
}

impl AdaptiveBackoff {
    pub fn new(base: Duration, step: Duration) -> Self {
        Self {
            base,
            step,
            current: base,
            last_len: None,
        }
    }

    /// Record an overloaded queue of length `len` and return how long the
    /// producer should sleep before enqueueing.
    pub fn observe(&mut self, len: usize) -> Duration {
        self.current = match self.last_len {
            None => self.base,
            Some(prev) if len > prev => self.current + self.step,
            Some(_) => self.current.saturating_sub(self.step).max(self.base),
        };
        self.last_len = Some(len);
        self.current
    }

    /// Forget the overload history (queue is back under capacity).
    pub fn reset(&mut self) {
        self.current = self.base;
        self.last_len = None;
    }

    /// The most recently returned delay (or `base` when idle).
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn base(&self) -> Duration {
        self.base
    }
}
