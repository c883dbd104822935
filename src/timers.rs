//! Cooperative timer queue (§3.6, §4.8).
//!
//! The original drove `setTimeout`/`setInterval` off a flat array scanned
//! every tick (`process_timers`) plus a real `sleep_ms(1)` between scans.
//! A min-heap keyed on (fire time, insertion order) gives the same FIFO-at
//! equal-deadline ordering without a linear rescan, and — since nothing
//! here depends on wall-clock jitter — we advance a virtual clock straight
//! to the next deadline instead of actually sleeping, so a program's output
//! is deterministic and a test suite never has to wait on a real timer.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::scope::ScopeRef;
use crate::value::Value;

pub struct ScheduledTimer {
    pub callback: Value,
    pub scope: ScopeRef,
    pub delay_ms: u64,
    pub repeating: bool,
}

impl ScheduledTimer {
    pub fn new(callback: Value, scope: ScopeRef, delay_ms: u64, repeating: bool) -> Self {
        Self { callback, scope, delay_ms, repeating }
    }
}

struct Entry {
    timer: ScheduledTimer,
    cancelled: bool,
}

/// A timer that has come due, handed back to the interpreter to invoke.
pub struct FiredTimer {
    pub callback: Value,
    pub scope: ScopeRef,
    pub line: usize,
    id: u64,
    delay_ms: u64,
    repeating: bool,
}

impl FiredTimer {
    /// `setInterval` callbacks reschedule themselves at the same delay,
    /// under the same id, so `clearInterval` keeps working mid-series.
    pub fn rearm(&self) -> Option<RearmRequest> {
        if self.repeating {
            Some(RearmRequest { id: self.id, delay_ms: self.delay_ms })
        } else {
            None
        }
    }
}

pub struct RearmRequest {
    id: u64,
    delay_ms: u64,
}

pub struct TimerQueue {
    entries: HashMap<u64, Entry>,
    heap: BinaryHeap<Reverse<(u64, u64, u64)>>, // (fire_at, seq, id)
    clock: u64,
    next_id: u64,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        TimerQueue { entries: HashMap::new(), heap: BinaryHeap::new(), clock: 0, next_id: 1, next_seq: 0 }
    }

    pub fn schedule(&mut self, timer: ScheduledTimer) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.insert(id, timer);
        id
    }

    fn insert(&mut self, id: u64, timer: ScheduledTimer) {
        let fire_at = self.clock + timer.delay_ms;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((fire_at, seq, id)));
        self.entries.insert(id, Entry { timer, cancelled: false });
    }

    /// Re-arms a still-live interval at the same delay from the current
    /// virtual clock. A no-op if the callback cancelled itself mid-fire.
    pub fn reschedule(&mut self, req: RearmRequest) {
        let still_live = match self.entries.get(&req.id) {
            Some(e) if !e.cancelled => true,
            _ => false,
        };
        if !still_live {
            self.entries.remove(&req.id);
            return;
        }
        let fire_at = self.clock + req.delay_ms;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((fire_at, seq, req.id)));
    }

    /// Marks `id` cancelled. Entries aren't removed eagerly so a timer can
    /// be cancelled from within its own firing callback.
    pub fn cancel(&mut self, id: u64) -> bool {
        match self.entries.get_mut(&id) {
            Some(e) if !e.cancelled => {
                e.cancelled = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advances the virtual clock directly, for the `sleep` builtin: since
    /// nothing here ever blocks on wall-clock time, "sleeping" means later
    /// timers see an already-elapsed delay rather than the process pausing.
    pub fn advance(&mut self, ms: u64) {
        self.clock += ms;
    }

    /// Pops the earliest live timer, advancing the virtual clock to its
    /// deadline. Cancelled/stale heap entries are skipped and dropped.
    /// One-shot timers are removed from `entries` here; repeating timers
    /// stay so `reschedule`/`cancel` can still see their state mid-fire.
    pub fn pop_due(&mut self) -> Option<FiredTimer> {
        while let Some(Reverse((fire_at, _seq, id))) = self.heap.pop() {
            let cancelled = match self.entries.get(&id) {
                Some(e) => e.cancelled,
                None => true,
            };
            if cancelled {
                self.entries.remove(&id);
                continue;
            }
            self.clock = fire_at;
            let entry = self.entries.get(&id).expect("checked present above");
            let callback = entry.timer.callback.clone();
            let scope = entry.timer.scope.clone();
            let delay_ms = entry.timer.delay_ms;
            let repeating = entry.timer.repeating;
            if !repeating {
                self.entries.remove(&id);
            }
            return Some(FiredTimer { callback, scope, line: 0, id, delay_ms, repeating });
        }
        None
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}
