// Tick-driven one-shot timers owned by the world task.

use std::time::Duration;

/// Handle returned by [`TimerQueue::schedule`]; used to cancel or query a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct PendingTimer<T> {
    handle: TimerHandle,
    remaining: Duration,
    action: T,
}

/// One-shot timers advanced by the fixed tick. Fired actions come back in the
/// order they were scheduled when several expire on the same tick.
#[derive(Debug)]
pub struct TimerQueue<T> {
    pending: Vec<PendingTimer<T>>,
    next_handle: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay: Duration, action: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(PendingTimer {
            handle,
            remaining: delay,
            action,
        });
        handle
    }

    /// Cancels a timer. Returns false when it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.handle != handle);
        before != self.pending.len()
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|timer| timer.handle == handle)
    }

    /// Advances every timer by `dt` and returns the actions that expired.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        let mut fired = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut timer in self.pending.drain(..) {
            timer.remaining = timer.remaining.saturating_sub(dt);
            if timer.remaining.is_zero() {
                fired.push(timer.action);
            } else {
                still_pending.push(timer);
            }
        }
        self.pending = still_pending;
        fired
    }

    /// Drops every pending timer (level teardown).
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
