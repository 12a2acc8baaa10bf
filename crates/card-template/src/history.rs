//! Bounded, debounced undo/redo over serialized side snapshots.
//!
//! Capture is a small state machine driven by the caller's clock:
//!
//! ```text
//!   Idle --record--> Pending(deadline) --tick past deadline--> Idle (+entry)
//!                      |   ^ record again replaces the pending capture
//!   undo/redo ------> Replaying --end_replay--> Idle
//! ```
//!
//! While replaying, `record` calls caused by loading the snapshot are dropped.

use crate::constants::{HISTORY_CAPACITY, HISTORY_DEBOUNCE_MS};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Nothing to undo")]
    Underflow,
    #[error("Nothing to redo")]
    Overflow,
}

/// An immutable serialized scene graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn new(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[derive(Debug, Clone)]
enum CaptureState {
    Idle,
    Pending { deadline: Instant, snapshot: Snapshot },
    Replaying,
}

/// Undo/redo stack for one side
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    index: usize,
    capacity: usize,
    debounce: Duration,
    state: CaptureState,
}

impl History {
    /// Start a history whose first entry is the side as loaded
    pub fn new(initial: Snapshot) -> Self {
        Self::with_limits(
            initial,
            HISTORY_CAPACITY,
            Duration::from_millis(HISTORY_DEBOUNCE_MS),
        )
    }

    pub fn with_limits(initial: Snapshot, capacity: usize, debounce: Duration) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.max(1));
        entries.push_back(initial);
        Self {
            entries,
            index: 0,
            capacity: capacity.max(1),
            debounce,
            state: CaptureState::Idle,
        }
    }

    /// Schedule a capture `debounce` after `now`.
    ///
    /// A capture that is already pending is replaced, so a burst of edits
    /// produces one entry. Returns false when the call was suppressed because
    /// a snapshot is being replayed.
    pub fn record(&mut self, snapshot: Snapshot, now: Instant) -> bool {
        if matches!(self.state, CaptureState::Replaying) {
            log::debug!("History capture suppressed during replay");
            return false;
        }
        self.state = CaptureState::Pending {
            deadline: now + self.debounce,
            snapshot,
        };
        true
    }

    /// Commit the pending capture if its quiet period has elapsed
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = matches!(
            &self.state,
            CaptureState::Pending { deadline, .. } if now >= *deadline
        );
        due && self.flush()
    }

    /// Commit the pending capture immediately. Returns true if an entry was added.
    pub fn flush(&mut self) -> bool {
        match std::mem::replace(&mut self.state, CaptureState::Idle) {
            CaptureState::Pending { snapshot, .. } => self.commit(snapshot),
            other => {
                self.state = other;
                false
            }
        }
    }

    fn commit(&mut self, snapshot: Snapshot) -> bool {
        if self.entries.get(self.index) == Some(&snapshot) {
            return false;
        }

        // New edits discard the redo branch
        self.entries.truncate(self.index + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
        true
    }

    /// Step back one entry and enter replay mode.
    ///
    /// A pending capture is committed first so the latest edit can be redone.
    pub fn undo(&mut self) -> Result<Snapshot, HistoryError> {
        self.flush();
        if self.index == 0 {
            return Err(HistoryError::Underflow);
        }
        self.index -= 1;
        self.state = CaptureState::Replaying;
        Ok(self.entries[self.index].clone())
    }

    /// Step forward one entry and enter replay mode
    pub fn redo(&mut self) -> Result<Snapshot, HistoryError> {
        self.flush();
        if self.index + 1 >= self.entries.len() {
            return Err(HistoryError::Overflow);
        }
        self.index += 1;
        self.state = CaptureState::Replaying;
        Ok(self.entries[self.index].clone())
    }

    /// Leave replay mode once the loaded snapshot is on screen
    pub fn end_replay(&mut self) {
        if matches!(self.state, CaptureState::Replaying) {
            self.state = CaptureState::Idle;
        }
    }

    pub fn current(&self) -> &Snapshot {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, CaptureState::Pending { .. })
    }

    pub fn is_replaying(&self) -> bool {
        matches!(self.state, CaptureState::Replaying)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0 || self.is_pending()
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Oldest to newest
    pub fn entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}
