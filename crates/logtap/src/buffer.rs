// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::entry::LogEntry;
use std::collections::VecDeque;

/// Ordered queue of entries waiting for delivery.
///
/// Capture sources append at the tail; the dispatcher drains the whole queue
/// into a batch and reinserts it at the head when delivery fails. The queue is
/// bounded: at capacity the oldest entry is evicted so sustained collector
/// failure keeps the freshest diagnostics instead of growing without bound.
pub struct EntryBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    dropped: u64,
}

impl EntryBuffer {
    pub fn new(capacity: usize) -> Self {
        EntryBuffer {
            entries: VecDeque::with_capacity(capacity.min(128)),
            capacity,
            dropped: 0,
        }
    }

    /// Append at the tail, evicting the oldest entry at capacity.
    pub fn append(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(entry);
    }

    /// Atomically take every held entry as one ordered batch, leaving the
    /// buffer empty.
    pub fn drain_all(&mut self) -> Vec<LogEntry> {
        self.entries.drain(..).collect()
    }

    /// Reinsert a failed batch at the head, ahead of anything appended since
    /// the drain and preserving the batch's internal order. The capacity
    /// bound is re-enforced afterwards, still evicting oldest-first.
    pub fn requeue_front(&mut self, batch: Vec<LogEntry>) {
        for entry in batch.into_iter().rev() {
            self.entries.push_front(entry);
        }
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries evicted by the capacity bound since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
