//! # CT - Club Tasks CLI
//!
//! A command-line front end for club task management: clubs pursue
//! objectives through tasks, and this tool keeps each task's derived state
//! (progress, status, blocking, completion) consistent as its checklist,
//! subtasks, assignments and dependencies change.
//!
//! ## Key Features
//!
//! - **Derived progress**: checklist or subtask completion drives the
//!   task's percentage; finishing the last item completes the task.
//! - **State machine**: explicit transition rules for blocking, unblocking
//!   and completion, with dependency gating through `blocked-by` edges.
//! - **Recurrence**: completing a recurring task spawns the next instance
//!   on a stable cadence anchored to its due date.
//! - **Analytics**: completion rates, club leaderboards and per-day
//!   growth/engagement series over a filterable task population.
//! - **Local File Storage**: a single JSON file per community, overridable
//!   with `--db`.
//!
//! ## Quick Start
//!
//! ```bash
//! # Set up a club and a member
//! ct club add "Chess Club"
//! ct user add "Ada"
//! ct club join 1 --user 1
//!
//! # Add a task with a checklist
//! ct --actor 1 add "Organise tournament" --club 1 --objective 1 --due 2024-06-01
//! ct --actor 1 check add 1 "Book venue"
//! ct --actor 1 check add 1 "Invite players"
//!
//! # Finishing the checklist auto-completes the task
//! ct --actor 1 check toggle 1 0
//! ct --actor 1 check toggle 1 1
//!
//! # Reporting
//! ct stats --club 1 --from 2024-01-01 --to 2024-06-30
//! ```
//!
//! Data is stored locally in `./club_tasks.json` unless `--db` points
//! elsewhere. Logging verbosity follows `RUST_LOG` (e.g. `RUST_LOG=debug`).

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod analytics;
pub mod assign;
pub mod cli;
pub mod cmd;
pub mod db;
pub mod deps;
pub mod error;
pub mod events;
pub mod fields;
pub mod progress;
pub mod recur;
pub mod state;
pub mod task;
#[cfg(test)]
pub mod testutil;

use cli::Cli;
use cmd::*;
use db::Database;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Completions need no database.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let db_path = cli
        .db
        .unwrap_or_else(|| PathBuf::from("club_tasks.json"));
    let mut db = Database::load(&db_path);
    let actor = cli.actor;

    match cli.command {
        Commands::Completions { .. } => unreachable!("handled above"),

        Commands::Add {
            title, club, objective, goal, desc, tags, due, priority, progress,
            every, interval, on_days, day_of_month, until, times,
        } => cmd_add(
            &mut db, &db_path, actor, title, club, objective, goal, desc, tags, due,
            priority, progress, every, interval, on_days, day_of_month, until, times,
        ),

        Commands::List { all, club, objective, status, priority, overdue, sort, limit } =>
            cmd_list(&db, all, club, objective, status, priority, overdue, sort, limit),

        Commands::View { id } => cmd_view(&db, id),

        Commands::Update { id, title, desc, due, priority, objective, goal, add_tags, rm_tags } =>
            cmd_update(&mut db, &db_path, actor, id, title, desc, due, priority, objective, goal,
                       add_tags, rm_tags),

        Commands::Assign { id, user, role } => cmd_assign(&mut db, &db_path, actor, id, user, role),

        Commands::Check { action } => cmd_check(&mut db, &db_path, actor, action),

        Commands::Subtask { action } => cmd_subtask(&mut db, &db_path, actor, action),

        Commands::Block { id, reason } => cmd_block(&mut db, &db_path, actor, id, reason),

        Commands::Unblock { id } => cmd_unblock(&mut db, &db_path, actor, id),

        Commands::Status { id, status } => cmd_status(&mut db, &db_path, actor, id, status),

        Commands::Progress { id, value } => cmd_progress(&mut db, &db_path, actor, id, value),

        Commands::Complete { id } => cmd_complete(&mut db, &db_path, actor, id),

        Commands::Comment { id, content, mentions, attachments } =>
            cmd_comment(&mut db, &db_path, actor, id, content, mentions, attachments),

        Commands::Dep { action } => cmd_dep(&mut db, &db_path, actor, action),

        Commands::Impact { id } => cmd_impact(&db, id),

        Commands::Stats { club, objective, goal, from, to, budget, json } =>
            cmd_stats(&db, club, objective, goal, from, to, budget, json),

        Commands::User { action } => cmd_user(&mut db, &db_path, action),

        Commands::Club { action } => cmd_club(&mut db, &db_path, action),
    }
}
