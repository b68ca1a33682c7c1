use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Task-creation form with validation and local draft autosave.
/// Storage defaults to ~/.taskdraft/storage.json or a path passed via --store.
#[derive(Parser)]
#[command(name = "taskdraft", version, about = "Task-creation form and draft manager")]
pub struct Cli {
    /// Path to the JSON storage file.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
