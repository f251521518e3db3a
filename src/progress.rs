//! Derived progress calculation.
//!
//! Exactly one source drives a task's progress: the checklist when it is
//! non-empty, otherwise the subtasks, otherwise whatever was set manually.

use crate::fields::SubtaskStatus;
use crate::task::Task;

/// Compute the task's completion percentage in [0, 100].
///
/// Pure and deterministic; safe to call on every checklist or subtask
/// mutation. Checklist takes precedence when both collections are
/// non-empty.
pub fn compute_progress(task: &Task) -> u8 {
    if !task.checklist.is_empty() {
        let done = task.checklist.iter().filter(|c| c.completed).count();
        percentage(done, task.checklist.len())
    } else if !task.subtasks.is_empty() {
        let done = task
            .subtasks
            .iter()
            .filter(|s| s.status == SubtaskStatus::Done)
            .count();
        percentage(done, task.subtasks.len())
    } else {
        task.progress
    }
}

fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}
