//! Document store and utility functions.
//!
//! This module provides the `Database` struct holding tasks, users, clubs
//! and the activity log, along with date parsing, formatting helpers and
//! the revision-checked task write used for optimistic concurrency.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::fields::*;
use crate::task::{ActivityRecord, Club, Task, User};

/// In-memory document store, persisted as a single JSON file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub clubs: Vec<Club>,
    #[serde(default)]
    pub activity: Vec<ActivityRecord>,
}

impl Database {
    /// Load database from JSON file, creating a new empty database if the
    /// file doesn't exist.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing DB, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading DB, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available user ID.
    pub fn next_user_id(&self) -> u64 {
        self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available club ID.
    pub fn next_club_id(&self) -> u64 {
        self.clubs.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a task by ID, or a NotFound error.
    pub fn require(&self, id: u64) -> CoreResult<&Task> {
        self.get(id).ok_or(CoreError::NotFound { kind: "task", id })
    }

    /// Get a club by ID.
    pub fn get_club(&self, id: u64) -> Option<&Club> {
        self.clubs.iter().find(|c| c.id == id)
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Replace a task record, enforcing the optimistic-concurrency check.
    ///
    /// `updated` must carry the revision the caller read; the stored task
    /// must still be at that revision or the write is rejected with
    /// `ConcurrentModification`. On success the revision is bumped and the
    /// new record swapped in whole (single-document atomicity).
    pub fn commit_task(&mut self, mut updated: Task) -> CoreResult<()> {
        let id = updated.id;
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(CoreError::NotFound { kind: "task", id })?;
        if slot.revision != updated.revision {
            return Err(CoreError::ConcurrentModification {
                task: id,
                expected: updated.revision,
                found: slot.revision,
            });
        }
        updated.revision += 1;
        *slot = updated;
        Ok(())
    }

    /// Append a tracked user action for engagement reporting.
    pub fn record_activity(&mut self, user: u64, action: &str, at_utc: i64) {
        self.activity.push(ActivityRecord {
            user,
            action: action.to_string(),
            at_utc,
        });
    }
}

/// Normalize a tag string by trimming, lowercasing, and replacing spaces
/// with hyphens.
pub fn normalise_tag(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated tag strings and normalize each tag.
pub fn split_and_normalise_tags(inputs: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let tag = normalise_tag(part);
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags.sort();
    tags.dedup();
    tags
}

/// Parse a due date: "today", "tomorrow", "in Nd"/"in Nw", or YYYY-MM-DD.
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calendar day (UTC) of an epoch-seconds timestamp.
pub fn day_of(ts_utc: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(ts_utc, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let delta = due - today;
    if delta.num_days() == 0 {
        "today".into()
    } else if delta.num_days() == 1 {
        "tomorrow".into()
    } else if delta.num_days() > 1 {
        format!("in {}d", delta.num_days())
    } else {
        format!("{}d late", -delta.num_days())
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::NotStarted => "NotStarted",
        Status::InProgress => "InProgress",
        Status::Blocked => "Blocked",
        Status::Completed => "Completed",
    }
}

/// Format a priority for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
}

/// Format an assignee role for display.
pub fn format_role(r: Role) -> &'static str {
    match r {
        Role::Owner => "Owner",
        Role::Contributor => "Contributor",
        Role::Reviewer => "Reviewer",
    }
}

/// Format a dependency relation for display.
pub fn format_relation(r: Relation) -> &'static str {
    match r {
        Relation::Blocks => "blocks",
        Relation::BlockedBy => "blocked-by",
        Relation::Related => "related",
    }
}

/// Print tasks in a formatted table.
pub fn print_table(db: &Database, tasks: &[&Task]) {
    println!(
        "{:<5} {:<11} {:<7} {:<5} {:<10} {:<14} {}",
        "ID", "Status", "Pri", "Prog", "Due", "Club", "Title [tags]"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.tags.join(","))
        };
        let club = db
            .get_club(t.club)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", t.club));
        println!(
            "{:<5} {:<11} {:<7} {:>3}% {:<10} {:<14} {}{}",
            t.id,
            format_status(t.status),
            format_priority(t.priority),
            t.progress,
            format_due_relative(t.due, today),
            truncate(&club, 14),
            t.title,
            tags
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}
