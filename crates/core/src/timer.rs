//! Deterministic one-shot/repeating timer store.
//!
//! [`SequenceTimer`] keeps payload-carrying timers ordered by deadline, with
//! same-deadline ties fired in start order. Nothing fires on its own: the
//! owner calls [`take_expired`](SequenceTimer::take_expired) periodically,
//! dispatches each expired entry, and calls
//! [`restart`](SequenceTimer::restart) for any entry whose handler did not
//! answer with a negative status ([`BE_REMOVED`] is the conventional
//! sentinel). This two-phase protocol removes a timer from the store
//! *before* its handler runs, so a handler that re-enters the owner never
//! observes its own timer as pending.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Return this from a timeout handler to keep the fired timer removed.
/// Any negative status has the same effect; a non-negative status asks the
/// owner to [`restart`](SequenceTimer::restart) the timer.
pub const BE_REMOVED: i32 = -1;

/// Timer id meaning "no timer".
pub const INVALID_TIMER_ID: i64 = -1;

struct Entry<T> {
    deadline: Instant,
    interval: Duration,
    payload: T,
}

/// A timer popped by [`SequenceTimer::take_expired`], ready for dispatch.
pub struct Expired<T> {
    /// The id originally returned by [`SequenceTimer::start_timer`].
    pub id: i64,
    /// The payload the timer was armed with.
    pub payload: T,
    interval: Duration,
}

/// Deadline-ordered timer store.
pub struct SequenceTimer<T> {
    next_id: i64,
    entries: HashMap<i64, Entry<T>>,
    // Ordering index; the i64 tiebreaker makes same-deadline timers fire
    // in start order.
    queue: BTreeMap<(Instant, i64), ()>,
}

impl<T> SequenceTimer<T> {
    pub fn new() -> Self {
        SequenceTimer {
            next_id: 0,
            entries: HashMap::new(),
            queue: BTreeMap::new(),
        }
    }

    /// Arm a timer that expires after `interval`, returning its id.
    pub fn start_timer(&mut self, interval: Duration, payload: T) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        let deadline = Instant::now() + interval;
        self.entries.insert(
            id,
            Entry {
                deadline,
                interval,
                payload,
            },
        );
        self.queue.insert((deadline, id), ());
        tracing::trace!(timer_id = id, interval_ms = interval.as_millis() as u64, "timer armed");
        id
    }

    /// Cancel a timer. A no-op if the id is unknown or already fired.
    pub fn stop_timer(&mut self, id: i64) {
        if let Some(entry) = self.entries.remove(&id) {
            self.queue.remove(&(entry.deadline, id));
            tracing::trace!(timer_id = id, "timer stopped");
        }
    }

    /// Number of armed timers.
    pub fn timer_num(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// in firing order.
    pub fn take_expired(&mut self, now: Instant) -> Vec<Expired<T>> {
        let mut expired = Vec::new();
        while let Some((&(deadline, id), _)) = self.queue.first_key_value() {
            if deadline > now {
                break;
            }
            self.queue.remove(&(deadline, id));
            if let Some(entry) = self.entries.remove(&id) {
                expired.push(Expired {
                    id,
                    payload: entry.payload,
                    interval: entry.interval,
                });
            }
        }
        expired
    }

    /// Re-arm a fired timer with its original interval, keeping its id.
    pub fn restart(&mut self, expired: Expired<T>) {
        let deadline = Instant::now() + expired.interval;
        self.entries.insert(
            expired.id,
            Entry {
                deadline,
                interval: expired.interval,
                payload: expired.payload,
            },
        );
        self.queue.insert((deadline, expired.id), ());
    }
}

impl<T> Default for SequenceTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}
