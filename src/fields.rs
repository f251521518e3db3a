//! Enumerations and field types for club task management.
//!
//! This module defines the structured data types used to classify tasks and
//! their sub-records: lifecycle status, priority, assignment roles,
//! dependency relations and recurrence frequencies.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task lifecycle status. `Completed` is terminal for a task instance;
/// a recurring series spawns a fresh task rather than reopening this one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotStarted,
    InProgress,
    Blocked,
    Completed,
}

/// Task priority classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Role an assignee holds on a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Contributor,
    Reviewer,
}

/// Relation a dependency edge carries. Only `BlockedBy` gates completion;
/// `Blocks` feeds downstream-impact reporting, `Related` is informational.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Blocks,
    BlockedBy,
    Related,
}

/// Completion status of a subtask.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    NotStarted,
    Done,
}

/// Recurrence frequency for repeating tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Due,
    Priority,
    Progress,
    Id,
}
