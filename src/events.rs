//! Logical events emitted by the lifecycle engine.
//!
//! The engine does not deliver notifications itself; it emits these records
//! so an external dispatcher can subscribe. In this binary they are logged
//! and echoed to the caller.

use serde::Serialize;

/// An event produced by a task update, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    TaskCompleted { task: u64, by: u64 },
    TaskBlocked { task: u64, reason: String },
    TaskAssigned { task: u64, user: u64, by: u64 },
    RecurrenceSpawned { task: u64, successor: u64 },
}

impl Event {
    /// Dotted event name as seen by subscribers.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TaskCompleted { .. } => "task.completed",
            Event::TaskBlocked { .. } => "task.blocked",
            Event::TaskAssigned { .. } => "task.assigned",
            Event::RecurrenceSpawned { .. } => "task.recurrence.spawned",
        }
    }
}

/// Log emitted events. Stands in for the external notification dispatcher.
pub fn publish(events: &[Event]) {
    for ev in events {
        tracing::info!(event = ev.name(), detail = ?ev, "event emitted");
    }
}
