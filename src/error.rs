//! Error types for the task lifecycle engine.

use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Every variant except `RecurrenceSpawnFailed` aborts the triggering
/// operation before any derived-state write; `RecurrenceSpawnFailed` is
/// non-fatal and only logged; the completion that triggered the spawn
/// stands.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input, rejected before any mutation.
    #[error("validation failed on {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Manual completion attempted while a blocked_by dependency is open.
    #[error("task {task} cannot complete: blocked by unfinished task {blocked_on}")]
    DependencyUnresolved { task: u64, blocked_on: u64 },

    /// Referenced task, checklist item or subtask does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Optimistic concurrency conflict on a single-task write. Retry.
    #[error("task {task} was modified concurrently (expected revision {expected}, found {found}); retry the update")]
    ConcurrentModification {
        task: u64,
        expected: u64,
        found: u64,
    },

    /// Spawning the next recurring instance failed. Non-fatal.
    #[error("failed to spawn recurrence successor of task {task}: {reason}")]
    RecurrenceSpawnFailed { task: u64, reason: String },
}

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;
