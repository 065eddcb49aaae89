//! Event Store - fixed-capacity circular buffer
//!
//! Holds the most recent `capacity` events in original temporal order.
//! Push is O(1): when full, the oldest entry is dropped first.

use std::collections::VecDeque;

use super::event::DiagnosticEvent;

// ============================================================================
// EVENT STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct EventStore {
    events: VecDeque<DiagnosticEvent>,
    capacity: usize,
    /// Lifetime count, independent of eviction
    total: u64,
}

impl EventStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Append an event, evicting the oldest when at capacity
    pub fn push(&mut self, event: DiagnosticEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total += 1;
    }

    /// Snapshot of the buffer, oldest to newest
    pub fn get_events(&self) -> Vec<DiagnosticEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DiagnosticEvent> + '_ {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&DiagnosticEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_event_count(&self) -> u64 {
        self.total
    }

    /// Events dropped by FIFO eviction so far
    pub fn evicted_count(&self) -> u64 {
        self.total - self.events.len() as u64
    }

    /// Drop everything and reset the lifetime counter
    pub fn clear(&mut self) {
        self.events.clear();
        self.total = 0;
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_CAPACITY)
    }
}
