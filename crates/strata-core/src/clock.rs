//! Logical clock for ordering replica events.
//!
//! Each replica advances its clock exactly once per local mutation and folds
//! peer clocks in while merging. The counter never decreases, so every
//! locally authored change carries a `db_version` greater than everything the
//! replica has seen before.

use serde::{Deserialize, Serialize};

/// A monotonically non-decreasing event counter.
///
/// `tick` is reserved for local mutations; incoming versions are folded in
/// with `observe`, which never increments on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalClock {
    time: u64,
}

impl LogicalClock {
    /// Create a clock starting at time 0.
    pub fn new() -> Self {
        LogicalClock { time: 0 }
    }

    /// Create a clock already advanced to `time`.
    pub fn at(time: u64) -> Self {
        LogicalClock { time }
    }

    /// Advance the clock for a local event and return the new time.
    pub fn tick(&mut self) -> u64 {
        debug_assert!(self.time < u64::MAX, "logical clock overflow");
        self.time += 1;
        self.time
    }

    /// Fold in a time observed from a peer: `max(self, observed)`.
    pub fn observe(&mut self, observed: u64) {
        self.time = self.time.max(observed);
    }

    /// Read the current time without side effects.
    pub fn now(&self) -> u64 {
        self.time
    }
}
