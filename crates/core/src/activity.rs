//! Activity feed shown next to the dashboard.
//!
//! Keeps the most recent entries only, newest first. Every entry is also emitted as a tracing
//! event so the feed and the process log tell the same story.

use crate::constants::ACTIVITY_LOG_CAPACITY;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    entries: Mutex<VecDeque<ActivityEntry>>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(ACTIVITY_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, message: impl Into<String>) {
        self.record_at(Utc::now(), message);
    }

    pub fn record_at(&self, at: DateTime<Utc>, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "hts::activity", "{}", message);

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_front(ActivityEntry { at, message });
        entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}
