//! Bounded in-memory event buffer.
//!
//! Lives behind the shipper's mutex. Every method is O(1) except the
//! batch takes, which only the flush task calls.

use std::collections::VecDeque;
use std::mem;

use crate::shipper::event::{unix_nanos, LabelSet, Level, LogEvent};

/// Result of offering an event to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Appended. `evicted` oldest events were discarded to stay in bounds.
    Accepted { len: usize, evicted: usize },
    /// The buffer was closed by the final drain.
    Closed,
}

#[derive(Debug)]
pub(crate) struct EventBuffer {
    events: VecDeque<LogEvent>,
    capacity: usize,
    last_timestamp: u64,
    closed: bool,
}

impl EventBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            last_timestamp: 0,
            closed: false,
        }
    }

    /// Stamp and append an event, evicting from the front when full.
    pub(crate) fn push(&mut self, level: Level, message: String, labels: &LabelSet) -> Admission {
        if self.closed {
            return Admission::Closed;
        }

        let timestamp = self.next_timestamp();
        self.events
            .push_back(LogEvent::new(timestamp, level, labels.clone(), message));

        let mut evicted = 0;
        while self.events.len() > self.capacity {
            self.events.pop_front();
            evicted += 1;
        }

        Admission::Accepted {
            len: self.events.len(),
            evicted,
        }
    }

    /// Swap the buffered events out for an empty buffer.
    pub(crate) fn take_all(&mut self) -> Vec<LogEvent> {
        Vec::from(mem::take(&mut self.events))
    }

    /// Refuse further events. Already buffered events stay until taken.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    #[cfg(test)]
    pub(crate) fn messages(&self) -> Vec<String> {
        self.events.iter().map(|e| e.message.clone()).collect()
    }

    // Strictly increasing so the sink never sees out-of-order entries,
    // even when the wall clock steps backwards.
    fn next_timestamp(&mut self) -> u64 {
        let ts = unix_nanos().max(self.last_timestamp.saturating_add(1));
        self.last_timestamp = ts;
        ts
    }
}
