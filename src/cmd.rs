//! Command implementations for the CLI interface.
//!
//! This module contains the command handlers for the various subcommands:
//! task CRUD, checklist/subtask edits, assignment, blocking, dependencies,
//! completion, recurrence inspection and the analytics report. Handlers
//! resolve inputs, call the lifecycle engine, persist and print; derived
//! state is never mutated here directly.

use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::analytics::{aggregate, TaskFilter};
use crate::assign::{assign, primary_assignee};
use crate::db::*;
use crate::deps::find_downstream;
use crate::error::CoreError;
use crate::events::{publish, Event};
use crate::fields::*;
use crate::state::{append_comment, apply_update, validate_new_task, UpdateOutcome};
use crate::task::*;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Club the task belongs to.
        #[arg(long)]
        club: u64,
        /// Objective the task is pursued under.
        #[arg(long)]
        objective: u64,
        /// Goal shortcut (denormalized from the objective).
        #[arg(long)]
        goal: Option<u64>,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: String,
        /// Priority: high | medium | low.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Initial manual progress (only meaningful without checklist/subtasks).
        #[arg(long, default_value_t = 0)]
        progress: u8,
        /// Recurrence frequency: daily | weekly | monthly | yearly.
        #[arg(long, value_enum)]
        every: Option<Frequency>,
        /// Recurrence interval (days/weeks/months/years per frequency).
        #[arg(long, default_value_t = 1)]
        interval: u32,
        /// Weekdays for weekly recurrence, 0=Sun..6=Sat. May be repeated.
        #[arg(long = "on-day")]
        on_days: Vec<u8>,
        /// Day of month for monthly recurrence.
        #[arg(long)]
        day_of_month: Option<u8>,
        /// Recurrence end date (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,
        /// Total number of occurrences in the series.
        #[arg(long)]
        times: Option<u32>,
    },

    /// List tasks with optional filters.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Filter by club.
        #[arg(long)]
        club: Option<u64>,
        /// Filter by objective.
        #[arg(long)]
        objective: Option<u64>,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by priority.
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Only overdue tasks.
        #[arg(long)]
        overdue: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Due)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID.
    View { id: u64 },

    /// Update fields on a task.
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        objective: Option<u64>,
        #[arg(long)]
        goal: Option<u64>,
        /// Add tags. May be repeated and comma-separated.
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        /// Remove tags. May be repeated and comma-separated.
        #[arg(long = "rm-tag")]
        rm_tags: Vec<String>,
    },

    /// Assign a user to a task (upsert by user).
    Assign {
        id: u64,
        /// User to assign.
        #[arg(long)]
        user: u64,
        /// Role: owner | contributor | reviewer.
        #[arg(long, value_enum, default_value_t = Role::Contributor)]
        role: Role,
    },

    /// Manage a task's checklist.
    Check {
        #[command(subcommand)]
        action: CheckAction,
    },

    /// Manage a task's subtasks.
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Block a task with a reason.
    Block {
        id: u64,
        /// Why the task is blocked.
        reason: String,
    },

    /// Clear a task's blocked reason.
    Unblock { id: u64 },

    /// Explicitly change a task's status.
    Status {
        id: u64,
        #[arg(value_enum)]
        status: Status,
    },

    /// Set manual progress on a task without checklist or subtasks.
    Progress {
        id: u64,
        /// Percentage in 0..=100.
        value: u8,
    },

    /// Mark a task completed (dependency-gated).
    Complete { id: u64 },

    /// Append a comment to a task.
    Comment {
        id: u64,
        content: String,
        /// Mentioned user ids. May be repeated.
        #[arg(long = "mention")]
        mentions: Vec<u64>,
        /// Attachment references. May be repeated.
        #[arg(long = "attach")]
        attachments: Vec<String>,
    },

    /// Manage dependency edges between tasks.
    Dep {
        #[command(subcommand)]
        action: DepAction,
    },

    /// Show tasks downstream of one through `blocks` edges.
    Impact { id: u64 },

    /// Aggregate analytics over the task population.
    Stats {
        #[arg(long)]
        club: Option<u64>,
        #[arg(long)]
        objective: Option<u64>,
        #[arg(long)]
        goal: Option<u64>,
        /// Window start (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,
        /// Window end (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,
        /// Max tasks to scan before returning a partial report.
        #[arg(long)]
        budget: Option<usize>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage platform users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage clubs.
    Club {
        #[command(subcommand)]
        action: ClubAction,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CheckAction {
    /// Add a checklist item.
    Add { id: u64, text: String },
    /// Toggle a checklist item's completion.
    Toggle { id: u64, item: u32 },
    /// Remove a checklist item.
    Rm { id: u64, item: u32 },
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Add a subtask.
    Add {
        id: u64,
        title: String,
        #[arg(long)]
        assignee: Option<u64>,
    },
    /// Mark a subtask done.
    Done { id: u64, subtask: u32 },
    /// Reopen a subtask.
    Reopen { id: u64, subtask: u32 },
}

#[derive(Subcommand)]
pub enum DepAction {
    /// Add a dependency edge.
    Add {
        id: u64,
        /// The other task.
        target: u64,
        /// Relation: blocks | blocked-by | related.
        #[arg(long, value_enum, default_value_t = Relation::Related)]
        relation: Relation,
    },
    /// Remove all edges to a target task.
    Rm { id: u64, target: u64 },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user.
    Add { name: String },
    /// List users.
    List,
}

#[derive(Subcommand)]
pub enum ClubAction {
    /// Create a club.
    Add { name: String },
    /// Add a user to a club's roster.
    Join {
        club: u64,
        #[arg(long)]
        user: u64,
    },
    /// List clubs.
    List,
}

fn now_utc() -> i64 {
    Utc::now().timestamp()
}

fn save_or_exit(db: &Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
}

fn exit_with(e: CoreError) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

/// Run one engine update, publish its events, persist and report.
fn run_update<F>(db: &mut Database, db_path: &Path, id: u64, actor: Option<u64>, f: F) -> UpdateOutcome
where
    F: FnOnce(&mut Task, &mut crate::state::UpdateCtx) -> Result<(), CoreError>,
{
    let now = now_utc();
    let outcome = match apply_update(db, id, actor, now, f) {
        Ok(o) => o,
        Err(e) => exit_with(e),
    };
    if let Some(user) = actor {
        db.record_activity(user, "task.update", now);
    }
    publish(&outcome.events);
    save_or_exit(db, db_path);
    for ev in &outcome.events {
        match ev {
            Event::TaskCompleted { task, by } => println!("Task {task} completed by user {by}"),
            Event::TaskBlocked { task, reason } => println!("Task {task} blocked: {reason}"),
            Event::TaskAssigned { task, user, .. } => println!("User {user} assigned to task {task}"),
            Event::RecurrenceSpawned { task, successor } => {
                println!("Recurrence: task {task} spawned successor {successor}")
            }
        }
    }
    outcome
}

/// Add a new task to the database.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    actor: Option<u64>,
    title: String,
    club: u64,
    objective: u64,
    goal: Option<u64>,
    desc: Option<String>,
    tags: Vec<String>,
    due: String,
    priority: Priority,
    progress: u8,
    every: Option<Frequency>,
    interval: u32,
    on_days: Vec<u8>,
    day_of_month: Option<u8>,
    until: Option<String>,
    times: Option<u32>,
) {
    let Some(due) = parse_due_input(&due) else {
        eprintln!("Unrecognised due date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
        std::process::exit(1);
    };
    let end_date = match until {
        Some(s) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                eprintln!("Unrecognised --until date, expected YYYY-MM-DD.");
                std::process::exit(1);
            }
        },
        None => None,
    };
    let recurrence = every.map(|frequency| RecurrenceRule {
        frequency,
        interval,
        days_of_week: on_days,
        day_of_month,
        end_date,
        occurrences: times,
        occurrence: 1,
    });

    let Some(creator) = actor else {
        eprintln!("add requires --actor <user-id> to attribute the creator.");
        std::process::exit(1);
    };
    let now = now_utc();
    let id = db.next_task_id();
    let task = Task {
        id,
        title,
        description: desc,
        tags: split_and_normalise_tags(&tags),
        club,
        objective,
        goal,
        status: Status::NotStarted,
        priority,
        due,
        start: Local::now().date_naive(),
        progress,
        assignees: vec![],
        checklist: vec![],
        subtasks: vec![],
        dependencies: vec![],
        recurrence,
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
        created_by: creator,
        created_at_utc: now,
        updated_at_utc: now,
        revision: 0,
    };
    if let Err(e) = validate_new_task(db, &task) {
        exit_with(e);
    }
    db.tasks.push(task);
    db.record_activity(creator, "task.create", now);
    save_or_exit(db, db_path);
    println!("Added task {id}");
}

/// List tasks with optional filtering and sorting.
#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    db: &Database,
    all: bool,
    club: Option<u64>,
    objective: Option<u64>,
    status: Option<Status>,
    priority: Option<Priority>,
    overdue: bool,
    sort: SortKey,
    limit: Option<usize>,
) {
    let today = Local::now().date_naive();
    let mut filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| {
            if !all && t.status == Status::Completed {
                return false;
            }
            if let Some(c) = club {
                if t.club != c {
                    return false;
                }
            }
            if let Some(o) = objective {
                if t.objective != o {
                    return false;
                }
            }
            if let Some(s) = status {
                if t.status != s {
                    return false;
                }
            }
            if let Some(p) = priority {
                if t.priority != p {
                    return false;
                }
            }
            if overdue && !t.is_overdue(today) {
                return false;
            }
            true
        })
        .collect();

    match sort {
        SortKey::Due => filtered.sort_by_key(|t| (t.due, t.id)),
        SortKey::Priority => {
            filtered.sort_by_key(|t| {
                let rank = match t.priority {
                    Priority::High => 0,
                    Priority::Medium => 1,
                    Priority::Low => 2,
                };
                (rank, t.id)
            });
        }
        SortKey::Progress => filtered.sort_by_key(|t| (std::cmp::Reverse(t.progress), t.id)),
        SortKey::Id => filtered.sort_by_key(|t| t.id),
    }

    if let Some(n) = limit {
        filtered.truncate(n);
    }
    print_table(db, &filtered);
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: u64) {
    let Some(task) = db.get(id) else {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    };
    let today = Local::now().date_naive();
    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", format_status(task.status));
    println!("Priority:     {}", format_priority(task.priority));
    println!("Progress:     {}%", task.progress);
    println!(
        "Club:         {}",
        db.get_club(task.club)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", task.club))
    );
    println!("Objective:    {}", task.objective);
    println!(
        "Goal:         {}",
        task.goal.map(|g| g.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("Due:          {} ({})", task.due, format_due_relative(task.due, today));
    println!("Overdue:      {}", if task.is_overdue(today) { "yes" } else { "no" });
    println!(
        "Owner:        {}",
        primary_assignee(task)
            .map(|a| format!("user {} ({})", a.user, format_role(a.role)))
            .unwrap_or_else(|| "-".into())
    );
    println!(
        "Tags:         {}",
        if task.tags.is_empty() { "-".into() } else { task.tags.join(",") }
    );
    if let Some(reason) = &task.blocked_reason {
        println!("Blocked:      {reason}");
    }
    if let Some(at) = task.completed_at_utc {
        println!(
            "Completed:    {} by user {}",
            Utc.timestamp_opt(at, 0).single().map(|d| d.to_rfc3339()).unwrap_or_default(),
            task.completed_by.unwrap_or(0)
        );
    }
    if let Some(rule) = &task.recurrence {
        println!(
            "Recurs:       every {} ({:?}), occurrence {}{}",
            rule.interval,
            rule.frequency,
            rule.occurrence,
            rule.occurrences.map(|n| format!(" of {n}")).unwrap_or_default()
        );
    }
    if let Some(parent) = task.parent_task {
        println!("Spawned from: task {parent}");
    }

    if !task.assignees.is_empty() {
        println!("Assignees:");
        for a in &task.assignees {
            println!("  user {} as {}", a.user, format_role(a.role));
        }
    }
    if !task.checklist.is_empty() {
        println!("Checklist:");
        for c in &task.checklist {
            println!("  [{}] #{} {}", if c.completed { "x" } else { " " }, c.id, c.text);
        }
    }
    if !task.subtasks.is_empty() {
        println!("Subtasks:");
        for s in &task.subtasks {
            let mark = if s.status == SubtaskStatus::Done { "x" } else { " " };
            println!("  [{mark}] #{} {}", s.id, s.title);
        }
    }
    if !task.dependencies.is_empty() {
        println!("Dependencies:");
        for d in &task.dependencies {
            println!("  {} task {}", format_relation(d.relation), d.task);
        }
    }
    if !task.comments.is_empty() {
        println!("Comments:");
        for c in &task.comments {
            println!("  user {}: {}", c.author, c.content);
        }
    }
}

/// Update an existing task's descriptive fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    actor: Option<u64>,
    id: u64,
    title: Option<String>,
    desc: Option<String>,
    due: Option<String>,
    priority: Option<Priority>,
    objective: Option<u64>,
    goal: Option<u64>,
    add_tags: Vec<String>,
    rm_tags: Vec<String>,
) {
    let due = match due {
        Some(ds) => match parse_due_input(&ds) {
            Some(d) => Some(d),
            None => {
                eprintln!("Unrecognised due date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
                std::process::exit(1);
            }
        },
        None => None,
    };
    run_update(db, db_path, id, actor, |t, _| {
        if let Some(s) = title {
            if s.trim().is_empty() {
                return Err(CoreError::Validation {
                    field: "title",
                    reason: "title cannot be empty".into(),
                });
            }
            t.title = s;
        }
        if let Some(d) = desc {
            t.description = if d.is_empty() { None } else { Some(d) };
        }
        if let Some(d) = due {
            t.due = d;
        }
        if let Some(p) = priority {
            t.priority = p;
        }
        if let Some(o) = objective {
            t.objective = o;
        }
        if let Some(g) = goal {
            t.goal = Some(g);
        }
        let add = split_and_normalise_tags(&add_tags);
        let rm = split_and_normalise_tags(&rm_tags);
        if !add.is_empty() || !rm.is_empty() {
            let mut set: std::collections::BTreeSet<String> = t.tags.iter().cloned().collect();
            for a in add {
                set.insert(a);
            }
            for r in rm {
                set.remove(&r);
            }
            t.tags = set.into_iter().collect();
        }
        Ok(())
    });
    println!("Updated task {id}");
}

/// Assign a user to a task, upserting by user.
pub fn cmd_assign(db: &mut Database, db_path: &Path, actor: Option<u64>, id: u64, user: u64, role: Role) {
    let now = now_utc();
    run_update(db, db_path, id, actor, |t, ctx| {
        let by = actor.unwrap_or(t.created_by);
        let added = assign(t, user, role, by, now);
        ctx.events.push(Event::TaskAssigned { task: t.id, user, by });
        if !added {
            println!("Updated existing assignment for user {user}");
        }
        Ok(())
    });
}

/// Checklist operations.
pub fn cmd_check(db: &mut Database, db_path: &Path, actor: Option<u64>, action: CheckAction) {
    let now = now_utc();
    match action {
        CheckAction::Add { id, text } => {
            run_update(db, db_path, id, actor, |t, _| {
                if text.trim().is_empty() {
                    return Err(CoreError::Validation {
                        field: "text",
                        reason: "checklist item text cannot be empty".into(),
                    });
                }
                let item_id = t.next_check_id;
                t.next_check_id += 1;
                t.checklist.push(ChecklistItem {
                    id: item_id,
                    text,
                    completed: false,
                    completed_by: None,
                    completed_at_utc: None,
                });
                println!("Added checklist item #{item_id} to task {id}");
                Ok(())
            });
        }
        CheckAction::Toggle { id, item } => {
            run_update(db, db_path, id, actor, |t, _| {
                let creator = t.created_by;
                let entry = t
                    .checklist
                    .iter_mut()
                    .find(|c| c.id == item)
                    .ok_or(CoreError::NotFound {
                        kind: "checklist item",
                        id: u64::from(item),
                    })?;
                entry.completed = !entry.completed;
                if entry.completed {
                    entry.completed_by = actor.or(Some(creator));
                    entry.completed_at_utc = Some(now);
                } else {
                    entry.completed_by = None;
                    entry.completed_at_utc = None;
                }
                Ok(())
            });
            println!("Toggled checklist item #{item}");
        }
        CheckAction::Rm { id, item } => {
            run_update(db, db_path, id, actor, |t, _| {
                let before = t.checklist.len();
                t.checklist.retain(|c| c.id != item);
                if t.checklist.len() == before {
                    return Err(CoreError::NotFound {
                        kind: "checklist item",
                        id: u64::from(item),
                    });
                }
                Ok(())
            });
            println!("Removed checklist item #{item}");
        }
    }
}

/// Subtask operations.
pub fn cmd_subtask(db: &mut Database, db_path: &Path, actor: Option<u64>, action: SubtaskAction) {
    let now = now_utc();
    match action {
        SubtaskAction::Add { id, title, assignee } => {
            run_update(db, db_path, id, actor, |t, _| {
                if title.trim().is_empty() {
                    return Err(CoreError::Validation {
                        field: "title",
                        reason: "subtask title cannot be empty".into(),
                    });
                }
                let sub_id = t.next_subtask_id;
                t.next_subtask_id += 1;
                t.subtasks.push(Subtask {
                    id: sub_id,
                    title,
                    status: SubtaskStatus::NotStarted,
                    assignee,
                    completed_at_utc: None,
                });
                println!("Added subtask #{sub_id} to task {id}");
                Ok(())
            });
        }
        SubtaskAction::Done { id, subtask } => {
            run_update(db, db_path, id, actor, |t, _| {
                let entry = t
                    .subtasks
                    .iter_mut()
                    .find(|s| s.id == subtask)
                    .ok_or(CoreError::NotFound {
                        kind: "subtask",
                        id: u64::from(subtask),
                    })?;
                entry.status = SubtaskStatus::Done;
                entry.completed_at_utc = Some(now);
                Ok(())
            });
            println!("Subtask #{subtask} done");
        }
        SubtaskAction::Reopen { id, subtask } => {
            run_update(db, db_path, id, actor, |t, _| {
                let entry = t
                    .subtasks
                    .iter_mut()
                    .find(|s| s.id == subtask)
                    .ok_or(CoreError::NotFound {
                        kind: "subtask",
                        id: u64::from(subtask),
                    })?;
                entry.status = SubtaskStatus::NotStarted;
                entry.completed_at_utc = None;
                Ok(())
            });
            println!("Subtask #{subtask} reopened");
        }
    }
}

/// Block a task with a reason; the state machine does the transition.
pub fn cmd_block(db: &mut Database, db_path: &Path, actor: Option<u64>, id: u64, reason: String) {
    run_update(db, db_path, id, actor, |t, _| {
        if reason.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "blocked_reason",
                reason: "a blocked task needs a non-empty reason".into(),
            });
        }
        t.blocked_reason = Some(reason);
        Ok(())
    });
}

/// Clear the blocked reason; the state machine restores the prior phase.
pub fn cmd_unblock(db: &mut Database, db_path: &Path, actor: Option<u64>, id: u64) {
    let outcome = run_update(db, db_path, id, actor, |t, _| {
        t.blocked_reason = None;
        Ok(())
    });
    println!("Task {id} is now {}", format_status(outcome.task.status));
}

/// Explicit status change through the state machine.
pub fn cmd_status(db: &mut Database, db_path: &Path, actor: Option<u64>, id: u64, status: Status) {
    let outcome = run_update(db, db_path, id, actor, |_, ctx| {
        ctx.requested_status = Some(status);
        Ok(())
    });
    println!("Task {id} is now {}", format_status(outcome.task.status));
}

/// Set manual progress; rejected when a checklist or subtasks drive it.
pub fn cmd_progress(db: &mut Database, db_path: &Path, actor: Option<u64>, id: u64, value: u8) {
    let outcome = run_update(db, db_path, id, actor, |t, _| {
        if value > 100 {
            return Err(CoreError::Validation {
                field: "progress",
                reason: format!("{value} is out of range 0..=100"),
            });
        }
        if !t.checklist.is_empty() || !t.subtasks.is_empty() {
            return Err(CoreError::Validation {
                field: "progress",
                reason: "progress is derived from the checklist/subtasks on this task".into(),
            });
        }
        t.progress = value;
        if t.status == Status::NotStarted && value > 0 {
            t.status = Status::InProgress;
        }
        Ok(())
    });
    println!("Task {id} progress {}%", outcome.task.progress);
}

/// Mark a task completed through the dependency-gated manual transition.
pub fn cmd_complete(db: &mut Database, db_path: &Path, actor: Option<u64>, id: u64) {
    run_update(db, db_path, id, actor, |_, ctx| {
        ctx.requested_status = Some(Status::Completed);
        Ok(())
    });
}

/// Append a comment to a task.
pub fn cmd_comment(
    db: &mut Database,
    db_path: &Path,
    actor: Option<u64>,
    id: u64,
    content: String,
    mentions: Vec<u64>,
    attachments: Vec<String>,
) {
    let Some(author) = actor else {
        eprintln!("comment requires --actor <user-id> to attribute the author.");
        std::process::exit(1);
    };
    let now = now_utc();
    if let Err(e) = append_comment(db, id, author, content, mentions, attachments, now) {
        exit_with(e);
    }
    db.record_activity(author, "task.comment", now);
    save_or_exit(db, db_path);
    println!("Comment added to task {id}");
}

/// Dependency edge operations.
pub fn cmd_dep(db: &mut Database, db_path: &Path, actor: Option<u64>, action: DepAction) {
    match action {
        DepAction::Add { id, target, relation } => {
            if db.get(target).is_none() {
                exit_with(CoreError::NotFound { kind: "task", id: target });
            }
            if id == target {
                eprintln!("A task cannot depend on itself.");
                std::process::exit(1);
            }
            run_update(db, db_path, id, actor, |t, _| {
                if t.dependencies.iter().any(|d| d.task == target && d.relation == relation) {
                    println!("Edge already present.");
                    return Ok(());
                }
                t.dependencies.push(Dependency { task: target, relation });
                Ok(())
            });
            println!("Task {id} {} task {target}", format_relation(relation));
        }
        DepAction::Rm { id, target } => {
            run_update(db, db_path, id, actor, |t, _| {
                let before = t.dependencies.len();
                t.dependencies.retain(|d| d.task != target);
                if t.dependencies.len() == before {
                    return Err(CoreError::NotFound { kind: "dependency on task", id: target });
                }
                Ok(())
            });
            println!("Removed edges from task {id} to task {target}");
        }
    }
}

/// Report tasks downstream of one through `blocks` edges.
pub fn cmd_impact(db: &Database, id: u64) {
    if db.get(id).is_none() {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    }
    let downstream = find_downstream(id, |tid| db.get(tid));
    if downstream.is_empty() {
        println!("No downstream tasks.");
        return;
    }
    println!("Tasks impacted by task {id}:");
    let impacted: Vec<&Task> = downstream.iter().filter_map(|tid| db.get(*tid)).collect();
    print_table(db, &impacted);
}

/// Aggregate analytics over the (optionally filtered) population.
#[allow(clippy::too_many_arguments)]
pub fn cmd_stats(
    db: &Database,
    club: Option<u64>,
    objective: Option<u64>,
    goal: Option<u64>,
    from: Option<String>,
    to: Option<String>,
    budget: Option<usize>,
    json: bool,
) {
    let parse = |s: &str| match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            eprintln!("Unrecognised date '{s}', expected YYYY-MM-DD.");
            std::process::exit(1);
        }
    };
    let window = match (from.as_deref(), to.as_deref()) {
        (Some(f), Some(t)) => Some((parse(f), parse(t))),
        (Some(f), None) => Some((parse(f), Local::now().date_naive())),
        (None, Some(t)) => Some((NaiveDate::MIN, parse(t))),
        (None, None) => None,
    };
    let filter = TaskFilter { club, objective, goal };
    let report = aggregate(db, &filter, window, budget);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to serialize report: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if report.partial {
        println!("NOTE: scan budget exhausted, report is PARTIAL.");
    }
    println!("Tasks:              {}", report.total_tasks);
    println!("Completed:          {}", report.completed_tasks);
    println!("Completion rate:    {:.1}%", report.task_completion_rate);
    println!("Avg tasks per user: {:.2}", report.average_tasks_per_user);
    if !report.top_performing_clubs.is_empty() {
        println!("Top clubs:");
        for c in report.top_performing_clubs.iter().take(5) {
            println!(
                "  {:<20} {:>4} completed, {} members",
                c.name, c.tasks_completed, c.member_count
            );
        }
    }
    if !report.user_growth.is_empty() {
        println!("Per-day (users / clubs / active / tasks created):");
        for (i, p) in report.user_growth.iter().enumerate() {
            let clubs = report.club_growth.get(i).map(|c| c.count).unwrap_or(0);
            let eng = report.user_engagement.get(i);
            println!(
                "  {}  +{} users  +{} clubs  {} active  {} tasks",
                p.day,
                p.count,
                clubs,
                eng.map(|e| e.active_users).unwrap_or(0),
                eng.map(|e| e.tasks_created).unwrap_or(0),
            );
        }
    }
}

/// User roster operations.
pub fn cmd_user(db: &mut Database, db_path: &Path, action: UserAction) {
    match action {
        UserAction::Add { name } => {
            if name.trim().is_empty() {
                eprintln!("User name cannot be empty.");
                std::process::exit(1);
            }
            let id = db.next_user_id();
            db.users.push(User {
                id,
                name,
                created_at_utc: now_utc(),
            });
            save_or_exit(db, db_path);
            println!("Added user {id}");
        }
        UserAction::List => {
            println!("{:<5} {}", "ID", "Name");
            for u in &db.users {
                println!("{:<5} {}", u.id, u.name);
            }
        }
    }
}

/// Club roster operations.
pub fn cmd_club(db: &mut Database, db_path: &Path, action: ClubAction) {
    match action {
        ClubAction::Add { name } => {
            if name.trim().is_empty() {
                eprintln!("Club name cannot be empty.");
                std::process::exit(1);
            }
            let id = db.next_club_id();
            db.clubs.push(Club {
                id,
                name,
                members: vec![],
                created_at_utc: now_utc(),
            });
            save_or_exit(db, db_path);
            println!("Added club {id}");
        }
        ClubAction::Join { club, user } => {
            if db.get_user(user).is_none() {
                exit_with(CoreError::NotFound { kind: "user", id: user });
            }
            let Some(c) = db.clubs.iter_mut().find(|c| c.id == club) else {
                exit_with(CoreError::NotFound { kind: "club", id: club });
            };
            if !c.members.contains(&user) {
                c.members.push(user);
            }
            save_or_exit(db, db_path);
            println!("User {user} joined club {club}");
        }
        ClubAction::List => {
            println!("{:<5} {:<20} {}", "ID", "Name", "Members");
            for c in &db.clubs {
                println!("{:<5} {:<20} {}", c.id, truncate(&c.name, 20), c.members.len());
            }
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
