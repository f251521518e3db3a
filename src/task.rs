//! Task data structure and embedded sub-records.
//!
//! This module defines the core `Task` struct that represents a single work
//! item belonging to a club and objective, together with its embedded
//! collections: checklist items, subtasks, assignees, dependency edges,
//! comments and an optional recurrence rule. Sub-records carry ids that are
//! unique only within their parent task; nothing outside the task ever
//! references them directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A work item owned by a club, pursued under an objective.
///
/// `progress` is cached derived state: it is recomputed from the checklist
/// (or subtasks) on every update because it gates the auto-complete
/// transition. All other derived values (overdue, primary assignee) are
/// computed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub club: u64,
    pub objective: u64,
    /// Denormalized shortcut to the objective's goal. Set at creation and on
    /// explicit update; nothing re-syncs it if the objective moves.
    pub goal: Option<u64>,
    pub status: Status,
    pub priority: Priority,
    pub due: NaiveDate,
    pub start: NaiveDate,
    pub progress: u8,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    /// Back-reference to the completed task that spawned this recurring
    /// instance. Informational only, not an ownership relation.
    #[serde(default)]
    pub parent_task: Option<u64>,
    #[serde(default)]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub blocked_by: Option<u64>,
    #[serde(default)]
    pub blocked_at_utc: Option<i64>,
    #[serde(default)]
    pub completed_at_utc: Option<i64>,
    #[serde(default)]
    pub completed_by: Option<u64>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub next_check_id: u32,
    #[serde(default)]
    pub next_subtask_id: u32,
    #[serde(default)]
    pub next_comment_id: u32,
    pub created_by: u64,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
    /// Optimistic-concurrency counter, bumped on every persisted write.
    #[serde(default)]
    pub revision: u64,
}

impl Task {
    /// Whether the task is past due and not yet completed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != Status::Completed && self.due < today
    }
}

/// A user's membership in a task's assignee set, unique per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignee {
    pub user: u64,
    pub role: Role,
    pub assigned_by: u64,
    pub assigned_at_utc: i64,
}

/// One checklist entry. The id is unique within the owning task only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: u32,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub completed_by: Option<u64>,
    #[serde(default)]
    pub completed_at_utc: Option<i64>,
}

/// One subtask entry. The id is unique within the owning task only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u32,
    pub title: String,
    pub status: SubtaskStatus,
    #[serde(default)]
    pub assignee: Option<u64>,
    #[serde(default)]
    pub completed_at_utc: Option<i64>,
}

/// A directed dependency edge from the owning task to `task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub task: u64,
    pub relation: Relation,
}

/// Recurrence rule attached to a task instance in a repeating series.
///
/// `occurrence` is the 1-based index of the instance the rule is attached
/// to; expansion stops once it reaches `occurrences` (when set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    /// Weekday set for weekly rules, 0 = Sunday .. 6 = Saturday.
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    /// Anchor day for monthly rules, clamped to the month length.
    #[serde(default)]
    pub day_of_month: Option<u8>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub occurrences: Option<u32>,
    #[serde(default = "default_occurrence")]
    pub occurrence: u32,
}

fn default_occurrence() -> u32 {
    1
}

/// An append-only discussion entry on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: u32,
    pub author: u64,
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<u64>,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at_utc: i64,
}

/// A platform member. Creation date feeds the growth time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub created_at_utc: i64,
}

/// A club with its member roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub members: Vec<u64>,
    pub created_at_utc: i64,
}

/// One tracked user action, appended by every mutating command.
/// Feeds the per-day engagement metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub user: u64,
    pub action: String,
    pub at_utc: i64,
}
