use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed club task manager CLI.
/// Storage defaults to ./club_tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "ct", version, about = "Club task lifecycle and analytics CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Acting user id, stamped on completions, assignments and blocks.
    /// The identity is trusted as supplied.
    #[arg(long, global = true)]
    pub actor: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}
