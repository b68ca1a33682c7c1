//! Interactive editing session.
//!
//! Reads commands line by line from stdin while the draft manager autosaves
//! in the background. The session starts as the compact (modal) entry surface;
//! `expand` hands the form over to the full-page surface, which picks it up
//! again on the next session start.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cmd::{print_draft_status, print_errors, print_form, submit_form};
use crate::draft::{DraftConfig, DraftManager};
use crate::fields::parse_field;
use crate::form::{AttachmentFile, FieldUpdate};
use crate::storage::KeyValueStore;
use crate::store::FormStateStore;

const HELP: &str = "\
Commands:
  set <field> <value>     set a field (e.g. `set assignee-id 2`)
  label add|remove <id>   select or deselect a label
  attach <path>           attach a file
  detach <id>             remove an attachment
  show                    show the form
  validate                validate the form
  save                    save a draft now
  status                  show draft state
  restore                 restore the saved draft
  discard                 delete the saved draft
  modal open [parent]     open the compact editor
  modal close             close the compact editor
  expand                  hand the form over to the full-page editor
  resume                  resume a handed-over form
  reset                   clear the form
  submit                  validate and submit
  help                    show this help
  quit                    leave the session";

/// Outcome of one session command.
enum Step {
    Continue,
    Quit,
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Run the session until `quit` or end of input.
pub async fn run_session(
    storage: Arc<dyn KeyValueStore>,
    config: DraftConfig,
    parent: Option<String>,
) -> io::Result<()> {
    let mut store = FormStateStore::with_storage(storage.clone());
    let mut drafts = DraftManager::new(storage, config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if store.should_navigate_to_full_page() {
        store.restore_from_navigation();
        println!("Resumed the form handed over from the compact editor.");
    } else {
        store.open_modal(parent);
    }

    if let Some(prompt_state) = drafts.check_for_draft() {
        let title = prompt_state.draft.data.title.clone();
        print!(
            "Found a draft \"{}\" saved {} min ago. Restore it? (y/N): ",
            if title.is_empty() { "(untitled)" } else { title.as_str() },
            prompt_state.age_minutes
        );
        let _ = io::stdout().flush();
        let answer = lines.next_line().await?.unwrap_or_default();
        if answer.trim().to_lowercase().starts_with('y') {
            drafts.accept_restore(prompt_state, &mut store);
            println!("Draft restored.");
        } else {
            if let Err(e) = drafts.reject_restore(prompt_state) {
                eprintln!("Failed to discard draft: {}", e);
            }
            println!("Draft discarded.");
        }
    }

    drafts.observe(store.form_data());
    println!("Type `help` for commands.");
    prompt();
    while let Some(line) = lines.next_line().await? {
        let step = handle_line(line.trim(), &mut store, &mut drafts).await;
        drafts.observe(store.form_data());
        if let Step::Quit = step {
            break;
        }
        prompt();
    }

    drafts.shutdown();
    Ok(())
}

async fn handle_line(line: &str, store: &mut FormStateStore, drafts: &mut DraftManager) -> Step {
    let mut parts = line.splitn(3, ' ');
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();
    let rest = parts.next().map(str::trim).unwrap_or_default();

    match command {
        "" => {}
        "set" => match parse_field(arg).and_then(|field| FieldUpdate::parse(field, rest)) {
            Ok(update) => store.update_field(update),
            Err(e) => println!("{}", e),
        },
        "label" => match arg {
            "add" if !rest.is_empty() => store.add_label(rest),
            "remove" if !rest.is_empty() => store.remove_label(rest),
            _ => println!("Usage: label add|remove <id>"),
        },
        "attach" => {
            let path = [arg, rest].join(" ");
            match AttachmentFile::from_path(std::path::Path::new(path.trim())) {
                Ok(file) => {
                    println!("Attached {} as {}.", file.name, file.id);
                    store.add_attachment(file);
                }
                Err(e) => println!("Failed to read '{}': {}", path.trim(), e),
            }
        }
        "detach" => {
            if store.remove_attachment(arg).is_none() {
                println!("No attachment with id {}.", arg);
            }
        }
        "show" => print_form(store.form_data()),
        "validate" => {
            if store.validate_form() {
                println!("Form is valid.");
            } else {
                print_errors(store.errors());
            }
        }
        "save" => match drafts.save_draft(store.form_data()).await {
            Ok(_) => println!("Draft saved."),
            Err(e) => println!("{}", e),
        },
        "status" => {
            let status = drafts.status();
            println!(
                "saving: {}, unsaved changes: {}, last saved: {}",
                status.is_draft_saving,
                status.has_draft_changes,
                status
                    .last_saved_time
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".into())
            );
            print_draft_status(drafts);
        }
        "restore" => {
            if !drafts.restore_draft(store) {
                println!("No draft to restore.");
            }
        }
        "discard" => match drafts.clear_draft() {
            Ok(()) => println!("Draft discarded."),
            Err(e) => println!("{}", e),
        },
        "modal" => match arg {
            "open" => store.open_modal((!rest.is_empty()).then(|| rest.to_string())),
            "close" => store.close_modal(),
            _ => println!("Usage: modal open [parent] | modal close"),
        },
        "expand" => {
            store.prepare_navigation_to_full_page();
            println!("Form handed over to the full-page editor.");
        }
        "resume" => {
            if !store.restore_from_navigation() {
                println!("Nothing to resume.");
            }
        }
        "reset" => store.reset_form(),
        "submit" => match submit_form(store, drafts) {
            Ok(request) => match serde_json::to_string_pretty(&request) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("Failed to encode request: {}", e),
            },
            Err(errors) => print_errors(&errors),
        },
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Step::Quit,
        other => println!("Unknown command '{}'. Type `help`.", other),
    }
    Step::Continue
}
