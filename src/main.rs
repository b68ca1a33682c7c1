//! # taskdraft
//!
//! Command-line front end for a task-creation form: field editing with
//! validation, a hand-off between a compact and a full-page editor, and a
//! locally persisted draft that autosaves after a quiet period.
//!
//! ## Quick Start
//!
//! ```bash
//! # Fill in the form
//! taskdraft set title "Prepare quarterly report"
//! taskdraft set assignment-date 2024-01-10
//! taskdraft validate
//!
//! # Keep a draft and come back to it later
//! taskdraft save
//! taskdraft draft
//!
//! # Or edit interactively with autosave
//! taskdraft session
//! ```
//!
//! Form state and the draft live in `~/.taskdraft/storage.json` under the
//! keys `task-form-store` and `task-form-draft`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod draft;
pub mod fields;
pub mod form;
pub mod import;
pub mod session;
pub mod storage;
pub mod store;
pub mod submit;
pub mod validation;

use cli::Cli;
use cmd::*;
use draft::{DraftConfig, DraftManager};
use storage::{FileStorage, KeyValueStore};
use store::FormStateStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_store_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(home).join(".taskdraft");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Failed to create storage directory {}: {}", dir.display(), e);
        std::process::exit(1);
    }
    dir.join("storage.json")
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let store_path = cli.store.unwrap_or_else(default_store_path);
    let file_storage = FileStorage::new(&store_path);
    tracing::debug!(path = %file_storage.path().display(), "using storage file");
    let storage: Arc<dyn KeyValueStore> = Arc::new(file_storage);

    if let Commands::Session { autosave_secs, parent } = cli.command {
        cmd_session(storage, autosave_secs, parent).await;
        return;
    }

    let mut store = FormStateStore::with_storage(storage.clone());
    let mut drafts = DraftManager::new(storage, DraftConfig::default());

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Session { .. } => unreachable!("session handled above"),
        Commands::Show => cmd_show(&store),
        Commands::Set { field, value } => cmd_set(&mut store, field, value),
        Commands::Label { action } => cmd_label(&mut store, action),
        Commands::Attach { path } => cmd_attach(&mut store, path),
        Commands::Detach { id } => cmd_detach(&mut store, id),
        Commands::Validate => cmd_validate(&mut store),
        Commands::Save => cmd_save(&store, &drafts).await,
        Commands::Draft => print_draft_status(&drafts),
        Commands::Restore => cmd_restore(&mut store, &mut drafts),
        Commands::Discard => cmd_discard(&mut drafts),
        Commands::Expand => cmd_expand(&mut store),
        Commands::Resume => cmd_resume(&mut store),
        Commands::Import { input } => cmd_import(&mut store, input),
        Commands::Submit => cmd_submit(&mut store, &mut drafts),
        Commands::Reset => cmd_reset(&mut store),
    }
}
