//! Task state machine: the ordered transition pipeline.
//!
//! Every mutation of a task runs through [`apply_update`]: the requested
//! change is applied to a working copy, derived progress is recomputed, the
//! transition rules fire in a fixed order (auto-complete, auto-block or
//! unblock, then any manual status change), and only then is the copy
//! swapped into the store in a single revision-checked write. An error at
//! any step leaves the stored task untouched; derived state is never
//! half-persisted.
//!
//! `Completed` is terminal for a task instance. When a completed task
//! carries a recurrence rule the successor is spawned synchronously inside
//! the same update; a spawn failure is logged and never rolls the
//! completion back.

use chrono::Local;
use tracing::{debug, warn};

use crate::db::Database;
use crate::deps;
use crate::error::{CoreError, CoreResult};
use crate::events::Event;
use crate::fields::Status;
use crate::progress::compute_progress;
use crate::recur;
use crate::task::Task;

/// Per-update context a mutation closure writes into.
#[derive(Default)]
pub struct UpdateCtx {
    /// Explicit status change requested by the caller, applied last and
    /// gated by the dependency check when it names `Completed`.
    pub requested_status: Option<Status>,
    /// Events raised by the mutation itself (e.g. assignment).
    pub events: Vec<Event>,
}

/// Result of a persisted update.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// The task as committed.
    pub task: Task,
    /// Events emitted by this update, in order.
    pub events: Vec<Event>,
    /// Recurrence successor spawned by a completion, if any.
    pub spawned: Option<Task>,
}

/// Run one atomic update against the task `id`.
///
/// `actor` is the caller-supplied identity; it stamps `completed_by` and
/// `blocked_by`, falling back to the task's creator when absent.
pub fn apply_update<F>(
    db: &mut Database,
    id: u64,
    actor: Option<u64>,
    now_utc: i64,
    mutate: F,
) -> CoreResult<UpdateOutcome>
where
    F: FnOnce(&mut Task, &mut UpdateCtx) -> CoreResult<()>,
{
    let stored = db.require(id)?.clone();
    let was_completed = stored.status == Status::Completed;
    let was_blocked_reason = non_empty(&stored.blocked_reason);

    let mut work = stored.clone();
    let mut ctx = UpdateCtx::default();
    mutate(&mut work, &mut ctx)?;

    if was_completed {
        // Completing a completed task is an idempotent no-op; anything
        // else is rejected since the instance is terminal.
        if ctx.requested_status == Some(Status::Completed) {
            return Ok(UpdateOutcome {
                task: stored,
                events: vec![],
                spawned: None,
            });
        }
        return Err(CoreError::Validation {
            field: "status",
            reason: format!("task {id} is completed and can no longer change"),
        });
    }
    let mut events = ctx.events;

    work.progress = compute_progress(&work);

    // Rule 1: auto-complete on fully derived progress.
    if work.progress == 100 && work.status != Status::Completed {
        complete(&mut work, actor, now_utc);
        events.push(Event::TaskCompleted {
            task: work.id,
            by: work.completed_by.unwrap_or(work.created_by),
        });
    }

    // Rule 2: auto-block on a newly set reason, auto-unblock on a cleared one.
    let has_reason = non_empty(&work.blocked_reason);
    if has_reason && !was_blocked_reason && work.status != Status::Blocked {
        work.status = Status::Blocked;
        work.blocked_at_utc = Some(now_utc);
        work.blocked_by = Some(actor.unwrap_or(work.created_by));
        events.push(Event::TaskBlocked {
            task: work.id,
            reason: work.blocked_reason.clone().unwrap_or_default(),
        });
    } else if !has_reason && was_blocked_reason && work.status == Status::Blocked {
        work.blocked_reason = None;
        work.blocked_at_utc = None;
        work.blocked_by = None;
        work.status = if work.progress > 0 {
            Status::InProgress
        } else {
            Status::NotStarted
        };
    }

    // Rule 3: manual status change, dependency-gated for completion.
    if let Some(requested) = ctx.requested_status {
        if requested == Status::Completed && work.status != Status::Completed {
            let snapshot = &*db;
            deps::can_complete(&work, |tid| snapshot.get(tid))?;
            complete(&mut work, actor, now_utc);
            events.push(Event::TaskCompleted {
                task: work.id,
                by: work.completed_by.unwrap_or(work.created_by),
            });
        } else if requested == Status::Blocked {
            if !non_empty(&work.blocked_reason) {
                return Err(CoreError::Validation {
                    field: "blocked_reason",
                    reason: "a blocked task needs a non-empty reason".into(),
                });
            }
            if work.status != Status::Blocked {
                work.status = Status::Blocked;
                work.blocked_at_utc = Some(now_utc);
                work.blocked_by = Some(actor.unwrap_or(work.created_by));
                events.push(Event::TaskBlocked {
                    task: work.id,
                    reason: work.blocked_reason.clone().unwrap_or_default(),
                });
            }
        } else if requested != Status::Completed && work.status != Status::Completed {
            if work.status == Status::Blocked {
                work.blocked_reason = None;
                work.blocked_at_utc = None;
                work.blocked_by = None;
            }
            work.status = requested;
        }
    }

    work.updated_at_utc = now_utc;
    let completed_now = work.status == Status::Completed;
    debug!(task = work.id, status = ?work.status, progress = work.progress, "committing update");
    db.commit_task(work.clone())?;

    // Recurrence runs after the completion is durable; its failure is
    // surfaced as a warning, never a rollback.
    let mut spawned = None;
    if completed_now && work.recurrence.is_some() {
        match spawn_successor(db, &work, now_utc) {
            Ok(Some(successor)) => {
                events.push(Event::RecurrenceSpawned {
                    task: work.id,
                    successor: successor.id,
                });
                spawned = Some(successor);
            }
            Ok(None) => debug!(task = work.id, "recurrence series ended"),
            Err(e) => {
                let e = CoreError::RecurrenceSpawnFailed {
                    task: work.id,
                    reason: e.to_string(),
                };
                warn!(error = %e, "recurrence spawn failed");
            }
        }
    }

    Ok(UpdateOutcome {
        task: work,
        events,
        spawned,
    })
}

/// Append a comment. Comments are append-only and remain allowed on
/// completed tasks, so they bypass the transition pipeline.
pub fn append_comment(
    db: &mut Database,
    id: u64,
    author: u64,
    content: String,
    mentions: Vec<u64>,
    attachments: Vec<String>,
    now_utc: i64,
) -> CoreResult<Task> {
    if content.trim().is_empty() {
        return Err(CoreError::Validation {
            field: "content",
            reason: "comment content cannot be empty".into(),
        });
    }
    let mut work = db.require(id)?.clone();
    let comment_id = work.next_comment_id;
    work.next_comment_id += 1;
    work.comments.push(crate::task::Comment {
        id: comment_id,
        author,
        content,
        mentions,
        attachments,
        created_at_utc: now_utc,
    });
    work.updated_at_utc = now_utc;
    db.commit_task(work.clone())?;
    Ok(work)
}

/// Validate a task record before it first enters the store.
pub fn validate_new_task(db: &Database, task: &Task) -> CoreResult<()> {
    if task.title.trim().is_empty() {
        return Err(CoreError::Validation {
            field: "title",
            reason: "title cannot be empty".into(),
        });
    }
    if task.progress > 100 {
        return Err(CoreError::Validation {
            field: "progress",
            reason: format!("{} is out of range 0..=100", task.progress),
        });
    }
    if db.get_club(task.club).is_none() {
        return Err(CoreError::Validation {
            field: "club",
            reason: format!("club {} does not exist", task.club),
        });
    }
    // The creator is the fallback identity for completed_by/blocked_by,
    // so it must be a real user.
    if db.get_user(task.created_by).is_none() {
        return Err(CoreError::Validation {
            field: "created_by",
            reason: format!("user {} does not exist", task.created_by),
        });
    }
    if let Some(rule) = &task.recurrence {
        if rule.interval == 0 {
            return Err(CoreError::Validation {
                field: "recurrence.interval",
                reason: "interval must be at least 1".into(),
            });
        }
        if rule.days_of_week.iter().any(|d| *d > 6) {
            return Err(CoreError::Validation {
                field: "recurrence.days_of_week",
                reason: "weekdays range 0 (Sunday) to 6 (Saturday)".into(),
            });
        }
        if let Some(day) = rule.day_of_month {
            if day == 0 || day > 31 {
                return Err(CoreError::Validation {
                    field: "recurrence.day_of_month",
                    reason: format!("{day} is out of range 1..=31"),
                });
            }
        }
    }
    Ok(())
}

fn complete(task: &mut Task, actor: Option<u64>, now_utc: i64) {
    task.status = Status::Completed;
    task.progress = 100;
    task.completed_at_utc = Some(now_utc);
    task.completed_by = Some(actor.unwrap_or(task.created_by));
    // A completed task is no longer blocked.
    task.blocked_reason = None;
    task.blocked_by = None;
    task.blocked_at_utc = None;
}

fn spawn_successor(db: &mut Database, completed: &Task, now_utc: i64) -> CoreResult<Option<Task>> {
    let today = Local::now().date_naive();
    let Some(successor) = recur::expand(completed, db.next_task_id(), today, now_utc) else {
        return Ok(None);
    };
    db.tasks.push(successor.clone());
    Ok(Some(successor))
}

fn non_empty(reason: &Option<String>) -> bool {
    reason.as_deref().is_some_and(|r| !r.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Frequency, Relation, SubtaskStatus};
    use crate::task::{Dependency, RecurrenceRule};
    use crate::testutil::{check_item, club, sample_task, subtask, user};

    fn db_with(tasks: Vec<Task>) -> Database {
        let mut db = Database::default();
        db.clubs.push(club(1, "Chess", vec![1, 2], 0));
        db.tasks = tasks;
        db
    }

    #[test]
    fn completing_last_checklist_item_auto_completes() {
        let mut t = sample_task(1);
        t.checklist = vec![check_item(0, true), check_item(1, false)];
        let mut db = db_with(vec![t]);

        let out = apply_update(&mut db, 1, Some(7), 1000, |task, _| {
            task.checklist[1].completed = true;
            Ok(())
        })
        .unwrap();

        assert_eq!(out.task.status, Status::Completed);
        assert_eq!(out.task.progress, 100);
        assert_eq!(out.task.completed_by, Some(7));
        assert_eq!(out.task.completed_at_utc, Some(1000));
        assert!(out
            .events
            .iter()
            .any(|e| matches!(e, Event::TaskCompleted { task: 1, by: 7 })));
    }

    #[test]
    fn completion_falls_back_to_creator_without_actor() {
        let mut t = sample_task(1);
        t.subtasks = vec![subtask(0, SubtaskStatus::NotStarted)];
        let mut db = db_with(vec![t]);

        let out = apply_update(&mut db, 1, None, 1000, |task, _| {
            task.subtasks[0].status = SubtaskStatus::Done;
            Ok(())
        })
        .unwrap();
        assert_eq!(out.task.completed_by, Some(1)); // creator
    }

    #[test]
    fn completed_is_terminal() {
        let mut t = sample_task(1);
        t.status = Status::Completed;
        t.completed_at_utc = Some(1);
        t.completed_by = Some(1);
        t.progress = 100;
        let mut db = db_with(vec![t]);

        let err = apply_update(&mut db, 1, None, 2000, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "status", .. }));
    }

    #[test]
    fn new_task_requires_known_creator() {
        let mut db = db_with(vec![]);
        let t = sample_task(1); // created_by 1, but no users registered yet
        let err = validate_new_task(&db, &t).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation { field: "created_by", .. }
        ));
        db.users.push(user(1, "ada", 0));
        assert!(validate_new_task(&db, &t).is_ok());
    }

    #[test]
    fn completing_a_completed_task_is_a_noop() {
        let mut t = sample_task(1);
        t.status = Status::Completed;
        t.completed_at_utc = Some(1);
        t.completed_by = Some(2);
        t.progress = 100;
        let mut db = db_with(vec![t]);

        let out = apply_update(&mut db, 1, Some(9), 5000, |_, ctx| {
            ctx.requested_status = Some(Status::Completed);
            Ok(())
        })
        .unwrap();
        assert!(out.events.is_empty());
        assert!(out.spawned.is_none());
        // No second transition: the original completion record stands.
        assert_eq!(out.task.completed_at_utc, Some(1));
        assert_eq!(out.task.completed_by, Some(2));
        assert_eq!(db.get(1).unwrap().revision, 0);
    }

    #[test]
    fn setting_blocked_reason_auto_blocks() {
        let mut db = db_with(vec![sample_task(1)]);
        let out = apply_update(&mut db, 1, Some(3), 1000, |task, _| {
            task.blocked_reason = Some("waiting on venue".into());
            Ok(())
        })
        .unwrap();
        assert_eq!(out.task.status, Status::Blocked);
        assert_eq!(out.task.blocked_at_utc, Some(1000));
        assert_eq!(out.task.blocked_by, Some(3));
        assert!(matches!(out.events[0], Event::TaskBlocked { task: 1, .. }));
    }

    #[test]
    fn clearing_reason_unblocks_based_on_progress() {
        // Zero progress unblocks to NotStarted.
        let mut t = sample_task(1);
        t.status = Status::Blocked;
        t.blocked_reason = Some("r".into());
        t.blocked_at_utc = Some(1);
        let mut db = db_with(vec![t]);
        let out = apply_update(&mut db, 1, None, 2000, |task, _| {
            task.blocked_reason = None;
            Ok(())
        })
        .unwrap();
        assert_eq!(out.task.status, Status::NotStarted);
        assert!(out.task.blocked_at_utc.is_none());

        // Partial progress unblocks to InProgress.
        let mut t = sample_task(2);
        t.status = Status::Blocked;
        t.blocked_reason = Some("r".into());
        t.blocked_at_utc = Some(1);
        t.checklist = vec![check_item(0, true), check_item(1, false)];
        db.tasks.push(t);
        let out = apply_update(&mut db, 2, None, 2000, |task, _| {
            task.blocked_reason = None;
            Ok(())
        })
        .unwrap();
        assert_eq!(out.task.status, Status::InProgress);
    }

    #[test]
    fn manual_completion_gated_by_open_blocker() {
        let mut t = sample_task(1);
        t.dependencies = vec![Dependency {
            task: 2,
            relation: Relation::BlockedBy,
        }];
        let blocker = sample_task(2);
        let mut db = db_with(vec![t, blocker]);

        let err = apply_update(&mut db, 1, Some(5), 1000, |_, ctx| {
            ctx.requested_status = Some(Status::Completed);
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::DependencyUnresolved { task: 1, blocked_on: 2 }
        ));
        // The gate aborts the whole update.
        let stored = db.get(1).unwrap();
        assert_eq!(stored.status, Status::NotStarted);
        assert_eq!(stored.revision, 0);
    }

    #[test]
    fn manual_completion_allowed_once_blocker_done() {
        let mut t = sample_task(1);
        t.dependencies = vec![Dependency {
            task: 2,
            relation: Relation::BlockedBy,
        }];
        let mut blocker = sample_task(2);
        blocker.status = Status::Completed;
        let mut db = db_with(vec![t, blocker]);

        let out = apply_update(&mut db, 1, Some(5), 1000, |_, ctx| {
            ctx.requested_status = Some(Status::Completed);
            Ok(())
        })
        .unwrap();
        assert_eq!(out.task.status, Status::Completed);
        assert_eq!(out.task.progress, 100);
    }

    #[test]
    fn manual_blocked_requires_reason() {
        let mut db = db_with(vec![sample_task(1)]);
        let err = apply_update(&mut db, 1, None, 1000, |_, ctx| {
            ctx.requested_status = Some(Status::Blocked);
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation { field: "blocked_reason", .. }
        ));
    }

    #[test]
    fn failed_mutation_leaves_store_untouched() {
        let mut db = db_with(vec![sample_task(1)]);
        let before = db.get(1).unwrap().clone();
        let _ = apply_update(&mut db, 1, None, 1000, |task, _| {
            task.title = "changed".into();
            Err(CoreError::Validation {
                field: "title",
                reason: "nope".into(),
            })
        })
        .unwrap_err();
        let after = db.get(1).unwrap();
        assert_eq!(after.title, before.title);
        assert_eq!(after.revision, before.revision);
        assert_eq!(after.updated_at_utc, before.updated_at_utc);
    }

    #[test]
    fn completion_spawns_recurrence_successor() {
        let mut t = sample_task(1);
        t.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: vec![],
            day_of_month: None,
            end_date: None,
            occurrences: None,
            occurrence: 1,
        });
        let mut db = db_with(vec![t]);

        let out = apply_update(&mut db, 1, Some(4), 1000, |_, ctx| {
            ctx.requested_status = Some(Status::Completed);
            Ok(())
        })
        .unwrap();

        let spawned = out.spawned.expect("successor spawned");
        assert_eq!(spawned.parent_task, Some(1));
        assert_eq!(spawned.status, Status::NotStarted);
        assert!(db.get(spawned.id).is_some());
        assert!(out
            .events
            .iter()
            .any(|e| matches!(e, Event::RecurrenceSpawned { task: 1, .. })));
    }

    #[test]
    fn comments_allowed_on_completed_tasks() {
        let mut t = sample_task(1);
        t.status = Status::Completed;
        t.completed_at_utc = Some(1);
        t.completed_by = Some(1);
        t.progress = 100;
        let mut db = db_with(vec![t]);

        let updated =
            append_comment(&mut db, 1, 9, "well done".into(), vec![], vec![], 2000).unwrap();
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.comments[0].author, 9);

        let err = append_comment(&mut db, 1, 9, "  ".into(), vec![], vec![], 2000).unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "content", .. }));
    }

    #[test]
    fn manual_transition_out_of_blocked_clears_block_fields() {
        let mut t = sample_task(1);
        t.status = Status::Blocked;
        t.blocked_reason = Some("r".into());
        t.blocked_at_utc = Some(1);
        t.blocked_by = Some(2);
        let mut db = db_with(vec![t]);

        let out = apply_update(&mut db, 1, None, 1000, |_, ctx| {
            ctx.requested_status = Some(Status::InProgress);
            Ok(())
        })
        .unwrap();
        assert_eq!(out.task.status, Status::InProgress);
        assert!(out.task.blocked_reason.is_none());
        assert!(out.task.blocked_at_utc.is_none());
        assert!(out.task.blocked_by.is_none());
    }
}
