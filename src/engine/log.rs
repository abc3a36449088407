//! Append-only session audit trail.

use crate::engine::models::LogEvent;

/// Event log for one game session.
///
/// Appends are ignored until the session has started. Events are never
/// removed or reordered; timestamps are clamped so they never go backwards.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    started: bool,
    events: Vec<LogEvent>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Append an event. Returns false (and drops the event) before start.
    pub fn append(&mut self, mut event: LogEvent) -> bool {
        if !self.started {
            return false;
        }
        if let Some(last) = self.events.last() {
            event.timestamp_ms = event.timestamp_ms.max(last.timestamp_ms);
        }
        self.events.push(event);
        true
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
