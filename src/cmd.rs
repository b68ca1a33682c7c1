//! Command implementations for the CLI interface.
//!
//! One-shot commands load the persisted form, apply one operation and exit;
//! `session` keeps the form open with autosave running.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::draft::{DraftConfig, DraftManager};
use crate::fields::*;
use crate::form::{AttachmentFile, FieldUpdate, TaskFormData, TaskFormErrors};
use crate::import::import_patch;
use crate::session::run_session;
use crate::storage::KeyValueStore;
use crate::store::FormStateStore;
use crate::submit::CreateTaskRequest;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current form.
    Show,

    /// Set a single form field.
    Set {
        /// Field name, e.g. title | assignee-id | assignment-date | is-recurring.
        #[arg(value_enum)]
        field: FormField,
        /// New value. Booleans: true/false. Labels: comma-separated ids.
        /// `-` clears optional values.
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Select or deselect labels.
    Label {
        #[command(subcommand)]
        action: LabelAction,
    },

    /// Attach a file to the form.
    Attach {
        /// Path of the file to attach.
        path: PathBuf,
    },

    /// Remove an attachment by id.
    Detach {
        /// Attachment id as shown by `show`.
        id: String,
    },

    /// Validate the form and list any errors.
    Validate,

    /// Save the form as a draft now.
    Save,

    /// Show whether a draft exists and how old it is.
    Draft,

    /// Restore the saved draft into the form.
    Restore,

    /// Delete the saved draft.
    Discard,

    /// Hand the form over to the full-page editor.
    Expand,

    /// Resume a form handed over with `expand`.
    Resume,

    /// Merge form fields from a JSON file.
    Import {
        /// JSON file with any subset of the form fields (camelCase keys).
        input: PathBuf,
    },

    /// Validate and submit the form, printing the request payload as JSON.
    Submit,

    /// Clear the form.
    Reset,

    /// Edit the form interactively with draft autosave.
    Session {
        /// Quiet period in seconds before an autosave.
        #[arg(long, default_value_t = 30)]
        autosave_secs: u64,
        /// Create the task as a subtask of this task id.
        #[arg(long)]
        parent: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum LabelAction {
    /// Select a label.
    Add { id: String },
    /// Deselect a label.
    Remove { id: String },
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

/// Print every field of the form.
pub fn print_form(data: &TaskFormData) {
    println!("Title:            {}", or_dash(&data.title));
    println!("Priority:         {}", format_priority(data.priority));
    println!("Topic:            {}", or_dash(&data.topic_id));
    println!("Task type:        {}", or_dash(&data.task_type_id));
    println!("Unit:             {}", or_dash(&data.unit_id));
    println!("Collab. unit:     {}", or_dash(&data.collaborating_unit_id));
    println!("Assignee:         {}", or_dash(&data.assignee_id));
    println!("Functional group: {}", or_dash(&data.functional_group_id));
    println!("Assignment ref.:  {}", or_dash(&data.assignment_reference_id));
    println!("Assignment date:  {}", or_dash(&data.assignment_date));
    println!("Expected end:     {}", or_dash(&data.expected_end_date));
    println!("Deadline:         {}", or_dash(&data.required_deadline));
    if data.is_recurring {
        println!(
            "Recurring:        {} every {} ({} .. {})",
            format_recurring_type(data.recurring_type),
            data.recurring_interval.map(|i| i.to_string()).unwrap_or_else(|| "-".into()),
            or_dash(&data.recurring_start_date),
            or_dash(&data.recurring_end_date),
        );
    } else {
        println!("Recurring:        no");
    }
    println!("Leadership dir.:  {}", if data.is_leadership_direction { "yes" } else { "no" });
    println!(
        "Labels:           {}",
        if data.label_ids.is_empty() { "-".into() } else { data.label_ids.join(",") }
    );
    if data.attachments.is_empty() {
        println!("Attachments:      -");
    } else {
        println!("Attachments:");
        for a in &data.attachments {
            println!("  {}  {} ({} bytes, {})", a.id, a.name, a.size, a.mime_type);
        }
    }
    println!("Description:\n{}", or_dash(&data.description));
    println!("Expected results:\n{}", or_dash(&data.expected_results));
}

/// Print validation errors, one per line.
pub fn print_errors(errors: &TaskFormErrors) {
    for (field, message) in errors {
        println!("  {:<22} {}", field.as_str(), message);
    }
}

/// Print a one-line summary of the stored draft.
pub fn print_draft_status(drafts: &DraftManager) {
    match (drafts.load_draft(), drafts.get_draft_age()) {
        (Some(draft), Some(age)) => {
            let title = if draft.data.title.is_empty() {
                "(untitled)"
            } else {
                draft.data.title.as_str()
            };
            println!(
                "Draft \"{}\" saved {} ({} min ago)",
                title,
                draft.metadata.last_saved.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                age
            );
        }
        _ => println!("No draft saved."),
    }
}

/// Validate and, if valid, build the request and close out the creation session.
pub fn submit_form(
    store: &mut FormStateStore,
    drafts: &mut DraftManager,
) -> Result<CreateTaskRequest, TaskFormErrors> {
    if !store.validate_form() {
        return Err(store.errors().clone());
    }
    let request = CreateTaskRequest::from_form(store.form_data(), store.modal_parent_task_id());
    store.reset_form();
    store.clear_navigation_data();
    store.close_modal();
    if let Err(e) = drafts.clear_draft() {
        tracing::warn!(error = %e, "failed to clear draft after submit");
    }
    Ok(request)
}

/// Handle the `show` command.
pub fn cmd_show(store: &FormStateStore) {
    print_form(store.form_data());
    if store.should_navigate_to_full_page() {
        println!("\n(Form handed over to the full-page editor; run `resume` to continue.)");
    }
}

/// Handle the `set` command.
pub fn cmd_set(store: &mut FormStateStore, field: FormField, value: String) {
    match FieldUpdate::parse(field, &value) {
        Ok(update) => {
            store.update_field(update);
            println!("Updated {}.", field);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Handle the `label` command.
pub fn cmd_label(store: &mut FormStateStore, action: LabelAction) {
    match action {
        LabelAction::Add { id } => {
            store.add_label(&id);
            println!("Selected label {}.", id);
        }
        LabelAction::Remove { id } => {
            store.remove_label(&id);
            println!("Deselected label {}.", id);
        }
    }
}

/// Handle the `attach` command.
pub fn cmd_attach(store: &mut FormStateStore, path: PathBuf) {
    match AttachmentFile::from_path(&path) {
        Ok(file) => {
            println!("Attached {} as {}.", file.name, file.id);
            store.add_attachment(file);
        }
        Err(e) => {
            eprintln!("Failed to read '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Handle the `detach` command.
pub fn cmd_detach(store: &mut FormStateStore, id: String) {
    match store.remove_attachment(&id) {
        Some(file) => println!("Removed {}.", file.name),
        None => {
            eprintln!("No attachment with id {}.", id);
            std::process::exit(1);
        }
    }
}

/// Handle the `validate` command.
pub fn cmd_validate(store: &mut FormStateStore) {
    if store.validate_form() {
        println!("Form is valid.");
    } else {
        println!("Form has {} error(s):", store.errors().len());
        print_errors(store.errors());
        std::process::exit(1);
    }
}

/// Handle the `save` command.
pub async fn cmd_save(store: &FormStateStore, drafts: &DraftManager) {
    match drafts.save_draft(store.form_data()).await {
        Ok(draft) => println!(
            "Draft saved at {}.",
            draft.metadata.last_saved.with_timezone(&Local).format("%H:%M:%S")
        ),
        Err(e) => {
            eprintln!("Failed to save draft: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle the `restore` command.
pub fn cmd_restore(store: &mut FormStateStore, drafts: &mut DraftManager) {
    if drafts.restore_draft(store) {
        println!("Draft restored.");
    } else {
        println!("No draft to restore.");
    }
}

/// Handle the `discard` command.
pub fn cmd_discard(drafts: &mut DraftManager) {
    if let Err(e) = drafts.clear_draft() {
        eprintln!("Failed to discard draft: {}", e);
        std::process::exit(1);
    }
    println!("Draft discarded.");
}

/// Handle the `expand` command.
pub fn cmd_expand(store: &mut FormStateStore) {
    store.prepare_navigation_to_full_page();
    println!("Form handed over to the full-page editor.");
}

/// Handle the `resume` command.
pub fn cmd_resume(store: &mut FormStateStore) {
    if store.restore_from_navigation() {
        println!("Resumed handed-over form.");
    } else {
        println!("Nothing to resume.");
    }
}

/// Handle the `import` command.
pub fn cmd_import(store: &mut FormStateStore, input: PathBuf) {
    match import_patch(&input) {
        Ok(patch) if patch.is_empty() => println!("Nothing to import."),
        Ok(patch) => {
            store.update_form_data(patch);
            println!("Imported {}.", input.display());
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Handle the `submit` command.
pub fn cmd_submit(store: &mut FormStateStore, drafts: &mut DraftManager) {
    match submit_form(store, drafts) {
        Ok(request) => match serde_json::to_string_pretty(&request) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode request: {}", e);
                std::process::exit(1);
            }
        },
        Err(errors) => {
            eprintln!("Form has {} error(s):", errors.len());
            for (field, message) in &errors {
                eprintln!("  {:<22} {}", field.as_str(), message);
            }
            std::process::exit(1);
        }
    }
}

/// Handle the `reset` command.
pub fn cmd_reset(store: &mut FormStateStore) {
    store.reset_form();
    println!("Form cleared.");
}

/// Handle the `session` command.
pub async fn cmd_session(
    storage: Arc<dyn KeyValueStore>,
    autosave_secs: u64,
    parent: Option<String>,
) {
    let config = DraftConfig {
        debounce: Duration::from_secs(autosave_secs),
        ..DraftConfig::default()
    };
    if let Err(e) = run_session(storage, config, parent).await {
        eprintln!("Session ended with an error: {}", e);
        std::process::exit(1);
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
