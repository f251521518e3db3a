//! Shared constructors for unit tests.

use chrono::NaiveDate;

use crate::fields::{Priority, Status, SubtaskStatus};
use crate::task::{ChecklistItem, Club, Subtask, Task, User};

/// A minimal valid task in club 1 / objective 1, due 2024-01-10.
pub fn sample_task(id: u64) -> Task {
    Task {
        id,
        title: format!("task {id}"),
        description: None,
        tags: vec![],
        club: 1,
        objective: 1,
        goal: None,
        status: Status::NotStarted,
        priority: Priority::Medium,
        due: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        progress: 0,
        assignees: vec![],
        checklist: vec![],
        subtasks: vec![],
        dependencies: vec![],
        recurrence: None,
        parent_task: None,
        blocked_reason: None,
        blocked_by: None,
        blocked_at_utc: None,
        completed_at_utc: None,
        completed_by: None,
        comments: vec![],
        next_check_id: 0,
        next_subtask_id: 0,
        next_comment_id: 0,
        created_by: 1,
        created_at_utc: 1_704_067_200, // 2024-01-01T00:00:00Z
        updated_at_utc: 1_704_067_200,
        revision: 0,
    }
}

pub fn check_item(id: u32, completed: bool) -> ChecklistItem {
    ChecklistItem {
        id,
        text: format!("item {id}"),
        completed,
        completed_by: None,
        completed_at_utc: None,
    }
}

pub fn subtask(id: u32, status: SubtaskStatus) -> Subtask {
    Subtask {
        id,
        title: format!("sub {id}"),
        status,
        assignee: None,
        completed_at_utc: None,
    }
}

pub fn user(id: u64, name: &str, created_at_utc: i64) -> User {
    User {
        id,
        name: name.to_string(),
        created_at_utc,
    }
}

pub fn club(id: u64, name: &str, members: Vec<u64>, created_at_utc: i64) -> Club {
    Club {
        id,
        name: name.to_string(),
        members,
        created_at_utc,
    }
}
