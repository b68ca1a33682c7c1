//! Form state for one task-creation session.
//!
//! `FormStateStore` owns the form data, its validation errors, modal
//! visibility and the navigation hand-off snapshot. When built with storage it
//! mirrors `{ formData, preservedData, shouldNavigateToFullPage }` to the
//! `task-form-store` key after every change; errors and modal state are never
//! persisted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fields::FormField;
use crate::form::{AttachmentFile, FieldUpdate, TaskFormData, TaskFormErrors, TaskFormPatch};
use crate::storage::KeyValueStore;
use crate::validation::validate;

/// Storage key of the persisted store slice.
pub const FORM_STORE_KEY: &str = "task-form-store";

/// The part of the store that survives a reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedFormSlice {
    pub form_data: TaskFormData,
    pub preserved_data: Option<TaskFormData>,
    pub should_navigate_to_full_page: bool,
}

/// Single source of truth for an in-progress creation form.
pub struct FormStateStore {
    form_data: TaskFormData,
    errors: TaskFormErrors,
    is_modal_open: bool,
    modal_parent_task_id: Option<String>,
    should_navigate_to_full_page: bool,
    preserved_data: Option<TaskFormData>,
    storage: Option<Arc<dyn KeyValueStore>>,
}

impl Default for FormStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FormStateStore {
    /// A store with an empty form and no persistence.
    pub fn new() -> Self {
        FormStateStore {
            form_data: TaskFormData::default(),
            errors: TaskFormErrors::new(),
            is_modal_open: false,
            modal_parent_task_id: None,
            should_navigate_to_full_page: false,
            preserved_data: None,
            storage: None,
        }
    }

    /// A store hydrated from, and mirrored to, `storage`.
    ///
    /// A missing or unreadable slice yields the empty form.
    pub fn with_storage(storage: Arc<dyn KeyValueStore>) -> Self {
        let slice = match storage.get(FORM_STORE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedFormSlice>(&raw) {
                Ok(slice) => slice,
                Err(e) => {
                    warn!(key = FORM_STORE_KEY, error = %e, "discarding unreadable form state");
                    PersistedFormSlice::default()
                }
            },
            Ok(None) => PersistedFormSlice::default(),
            Err(e) => {
                warn!(key = FORM_STORE_KEY, error = %e, "failed to read form state");
                PersistedFormSlice::default()
            }
        };
        let mut store = Self::new();
        store.form_data = slice.form_data;
        store.preserved_data = slice.preserved_data;
        store.should_navigate_to_full_page = slice.should_navigate_to_full_page;
        store.storage = Some(storage);
        store
    }

    pub fn form_data(&self) -> &TaskFormData {
        &self.form_data
    }

    pub fn errors(&self) -> &TaskFormErrors {
        &self.errors
    }

    pub fn is_modal_open(&self) -> bool {
        self.is_modal_open
    }

    pub fn modal_parent_task_id(&self) -> Option<&str> {
        self.modal_parent_task_id.as_deref()
    }

    pub fn should_navigate_to_full_page(&self) -> bool {
        self.should_navigate_to_full_page
    }

    pub fn preserved_data(&self) -> Option<&TaskFormData> {
        self.preserved_data.as_ref()
    }

    /// Set one field and drop any error recorded for it, without re-validating.
    pub fn update_field(&mut self, update: FieldUpdate) {
        let field = update.field();
        update.apply(&mut self.form_data);
        self.errors.remove(&field);
        self.sync();
    }

    /// Shallow-merge a partial record into the form.
    pub fn update_form_data(&mut self, patch: TaskFormPatch) {
        self.form_data.merge(patch);
        self.sync();
    }

    /// Select a label. Selecting an already selected label changes nothing.
    pub fn add_label(&mut self, label_id: &str) {
        if !self.form_data.label_ids.iter().any(|l| l == label_id) {
            self.form_data.label_ids.push(label_id.to_string());
        }
        self.errors.remove(&FormField::LabelIds);
        self.sync();
    }

    /// Deselect a label.
    pub fn remove_label(&mut self, label_id: &str) {
        self.form_data.label_ids.retain(|l| l != label_id);
        self.errors.remove(&FormField::LabelIds);
        self.sync();
    }

    /// Append an uploaded file.
    pub fn add_attachment(&mut self, file: AttachmentFile) {
        self.form_data.attachments.push(file);
        self.errors.remove(&FormField::Attachments);
        self.sync();
    }

    /// Remove an uploaded file by id, returning it if present.
    pub fn remove_attachment(&mut self, id: &str) -> Option<AttachmentFile> {
        let idx = self.form_data.attachments.iter().position(|a| a.id == id)?;
        let removed = self.form_data.attachments.remove(idx);
        self.errors.remove(&FormField::Attachments);
        self.sync();
        Some(removed)
    }

    /// Replace the error map with a fresh validation of the current data.
    pub fn validate_form(&mut self) -> bool {
        self.errors = validate(&self.form_data);
        self.errors.is_empty()
    }

    /// Empty the form and its errors. Modal and navigation state are untouched.
    pub fn reset_form(&mut self) {
        self.form_data = TaskFormData::default();
        self.errors.clear();
        self.sync();
    }

    pub fn open_modal(&mut self, parent_task_id: Option<String>) {
        self.is_modal_open = true;
        self.modal_parent_task_id = parent_task_id;
    }

    pub fn close_modal(&mut self) {
        self.is_modal_open = false;
        self.modal_parent_task_id = None;
    }

    /// Snapshot the form for the full-page surface and close the modal.
    pub fn prepare_navigation_to_full_page(&mut self) {
        self.preserved_data = Some(self.form_data.clone());
        self.should_navigate_to_full_page = true;
        self.close_modal();
        self.sync();
    }

    pub fn clear_navigation_data(&mut self) {
        self.preserved_data = None;
        self.should_navigate_to_full_page = false;
        self.sync();
    }

    /// Resume from the navigation snapshot, if there is one.
    pub fn restore_from_navigation(&mut self) -> bool {
        let Some(snapshot) = self.preserved_data.take() else {
            return false;
        };
        self.form_data = snapshot;
        self.should_navigate_to_full_page = false;
        self.sync();
        true
    }

    /// The slice written to storage.
    pub fn persisted_slice(&self) -> PersistedFormSlice {
        PersistedFormSlice {
            form_data: self.form_data.clone(),
            preserved_data: self.preserved_data.clone(),
            should_navigate_to_full_page: self.should_navigate_to_full_page,
        }
    }

    // Persistence failures are logged and otherwise ignored.
    fn sync(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let raw = match serde_json::to_string(&self.persisted_slice()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to encode form state");
                return;
            }
        };
        match storage.set(FORM_STORE_KEY, &raw) {
            Ok(()) => debug!(key = FORM_STORE_KEY, bytes = raw.len(), "form state persisted"),
            Err(e) => warn!(key = FORM_STORE_KEY, error = %e, "failed to persist form state"),
        }
    }
}
