//! Task-creation form data and the edits that can be applied to it.
//!
//! `TaskFormData` is the canonical mutable record behind a creation session.
//! Edits arrive either as a typed single-field `FieldUpdate` or as a
//! `TaskFormPatch` that is shallow-merged over the current values.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::fields::*;

/// Sparse mapping from field to message. A missing key means the field is valid.
pub type TaskFormErrors = BTreeMap<FormField, String>;

/// An uploaded file attached to the form, kept in upload order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// In-memory file content. Never persisted.
    #[serde(skip)]
    pub content: Option<Arc<[u8]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// Content handles do not survive persistence, so equality is on metadata only.
impl PartialEq for AttachmentFile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.size == other.size
            && self.mime_type == other.mime_type
            && self.url == other.url
    }
}

impl AttachmentFile {
    /// Build an attachment from a file on disk, loading its content.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(AttachmentFile {
            id: Uuid::new_v4().to_string(),
            mime_type: mime_guess::from_path(path).first_or_octet_stream().to_string(),
            size: bytes.len() as u64,
            name,
            content: Some(Arc::from(bytes)),
            url: Some(format!("file://{}", absolute.display())),
        })
    }
}

/// The in-progress contents of a task-creation form.
///
/// Date-valued fields hold ISO date strings; an empty string means unset.
/// Foreign keys are opaque ids and are not checked against reference data here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFormData {
    pub title: String,
    pub description: String,
    pub expected_results: String,
    pub priority: FormPriority,
    pub assignee_id: String,
    pub unit_id: String,
    pub collaborating_unit_id: String,
    pub assignment_reference_id: String,
    pub topic_id: String,
    pub functional_group_id: String,
    pub task_type_id: String,
    pub assignment_date: String,
    pub expected_end_date: String,
    pub required_deadline: String,
    pub is_recurring: bool,
    pub recurring_type: Option<RecurringType>,
    pub recurring_interval: Option<u32>,
    pub recurring_start_date: String,
    pub recurring_end_date: String,
    pub is_leadership_direction: bool,
    pub attachments: Vec<AttachmentFile>,
    pub label_ids: Vec<String>,
}

impl TaskFormData {
    /// Whether the form holds enough to be worth keeping as a draft.
    pub fn has_meaningful_content(&self) -> bool {
        !self.title.is_empty()
            || !self.description.is_empty()
            || !self.assignee_id.is_empty()
            || !self.unit_id.is_empty()
            || !self.label_ids.is_empty()
    }

    /// Shallow-merge a partial record: every field present in the patch replaces the current value.
    pub fn merge(&mut self, patch: TaskFormPatch) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field { self.$field = v; })*
            };
        }
        take!(
            title, description, expected_results, priority, assignee_id, unit_id,
            collaborating_unit_id, assignment_reference_id, topic_id, functional_group_id,
            task_type_id, assignment_date, expected_end_date, required_deadline, is_recurring,
            recurring_type, recurring_interval, recurring_start_date, recurring_end_date,
            is_leadership_direction, attachments,
        );
        if let Some(labels) = patch.label_ids {
            self.label_ids = dedup_labels(labels);
        }
    }
}

/// Remove repeated label ids, keeping the first occurrence of each in selection order.
pub fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

/// A partial `TaskFormData`. Absent fields are left untouched by a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFormPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub expected_results: Option<String>,
    pub priority: Option<FormPriority>,
    pub assignee_id: Option<String>,
    pub unit_id: Option<String>,
    pub collaborating_unit_id: Option<String>,
    pub assignment_reference_id: Option<String>,
    pub topic_id: Option<String>,
    pub functional_group_id: Option<String>,
    pub task_type_id: Option<String>,
    pub assignment_date: Option<String>,
    pub expected_end_date: Option<String>,
    pub required_deadline: Option<String>,
    pub is_recurring: Option<bool>,
    #[serde(deserialize_with = "present_or_null")]
    pub recurring_type: Option<Option<RecurringType>>,
    #[serde(deserialize_with = "present_or_null")]
    pub recurring_interval: Option<Option<u32>>,
    pub recurring_start_date: Option<String>,
    pub recurring_end_date: Option<String>,
    pub is_leadership_direction: Option<bool>,
    pub attachments: Option<Vec<AttachmentFile>>,
    pub label_ids: Option<Vec<String>>,
}

// Only called when the key is present, so `null` becomes `Some(None)` (clear)
// while a missing key falls back to the `None` default (leave untouched).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TaskFormPatch {
    /// Whether the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == TaskFormPatch::default()
    }
}

impl From<TaskFormData> for TaskFormPatch {
    fn from(d: TaskFormData) -> Self {
        TaskFormPatch {
            title: Some(d.title),
            description: Some(d.description),
            expected_results: Some(d.expected_results),
            priority: Some(d.priority),
            assignee_id: Some(d.assignee_id),
            unit_id: Some(d.unit_id),
            collaborating_unit_id: Some(d.collaborating_unit_id),
            assignment_reference_id: Some(d.assignment_reference_id),
            topic_id: Some(d.topic_id),
            functional_group_id: Some(d.functional_group_id),
            task_type_id: Some(d.task_type_id),
            assignment_date: Some(d.assignment_date),
            expected_end_date: Some(d.expected_end_date),
            required_deadline: Some(d.required_deadline),
            is_recurring: Some(d.is_recurring),
            recurring_type: Some(d.recurring_type),
            recurring_interval: Some(d.recurring_interval),
            recurring_start_date: Some(d.recurring_start_date),
            recurring_end_date: Some(d.recurring_end_date),
            is_leadership_direction: Some(d.is_leadership_direction),
            attachments: Some(d.attachments),
            label_ids: Some(d.label_ids),
        }
    }
}

/// A single typed field edit.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Title(String),
    Description(String),
    ExpectedResults(String),
    Priority(FormPriority),
    AssigneeId(String),
    UnitId(String),
    CollaboratingUnitId(String),
    AssignmentReferenceId(String),
    TopicId(String),
    FunctionalGroupId(String),
    TaskTypeId(String),
    AssignmentDate(String),
    ExpectedEndDate(String),
    RequiredDeadline(String),
    IsRecurring(bool),
    RecurringType(Option<RecurringType>),
    RecurringInterval(Option<u32>),
    RecurringStartDate(String),
    RecurringEndDate(String),
    IsLeadershipDirection(bool),
    Attachments(Vec<AttachmentFile>),
    LabelIds(Vec<String>),
}

impl FieldUpdate {
    /// The field this edit targets.
    pub fn field(&self) -> FormField {
        match self {
            FieldUpdate::Title(_) => FormField::Title,
            FieldUpdate::Description(_) => FormField::Description,
            FieldUpdate::ExpectedResults(_) => FormField::ExpectedResults,
            FieldUpdate::Priority(_) => FormField::Priority,
            FieldUpdate::AssigneeId(_) => FormField::AssigneeId,
            FieldUpdate::UnitId(_) => FormField::UnitId,
            FieldUpdate::CollaboratingUnitId(_) => FormField::CollaboratingUnitId,
            FieldUpdate::AssignmentReferenceId(_) => FormField::AssignmentReferenceId,
            FieldUpdate::TopicId(_) => FormField::TopicId,
            FieldUpdate::FunctionalGroupId(_) => FormField::FunctionalGroupId,
            FieldUpdate::TaskTypeId(_) => FormField::TaskTypeId,
            FieldUpdate::AssignmentDate(_) => FormField::AssignmentDate,
            FieldUpdate::ExpectedEndDate(_) => FormField::ExpectedEndDate,
            FieldUpdate::RequiredDeadline(_) => FormField::RequiredDeadline,
            FieldUpdate::IsRecurring(_) => FormField::IsRecurring,
            FieldUpdate::RecurringType(_) => FormField::RecurringType,
            FieldUpdate::RecurringInterval(_) => FormField::RecurringInterval,
            FieldUpdate::RecurringStartDate(_) => FormField::RecurringStartDate,
            FieldUpdate::RecurringEndDate(_) => FormField::RecurringEndDate,
            FieldUpdate::IsLeadershipDirection(_) => FormField::IsLeadershipDirection,
            FieldUpdate::Attachments(_) => FormField::Attachments,
            FieldUpdate::LabelIds(_) => FormField::LabelIds,
        }
    }

    /// Write the value into the form.
    pub fn apply(self, data: &mut TaskFormData) {
        match self {
            FieldUpdate::Title(v) => data.title = v,
            FieldUpdate::Description(v) => data.description = v,
            FieldUpdate::ExpectedResults(v) => data.expected_results = v,
            FieldUpdate::Priority(v) => data.priority = v,
            FieldUpdate::AssigneeId(v) => data.assignee_id = v,
            FieldUpdate::UnitId(v) => data.unit_id = v,
            FieldUpdate::CollaboratingUnitId(v) => data.collaborating_unit_id = v,
            FieldUpdate::AssignmentReferenceId(v) => data.assignment_reference_id = v,
            FieldUpdate::TopicId(v) => data.topic_id = v,
            FieldUpdate::FunctionalGroupId(v) => data.functional_group_id = v,
            FieldUpdate::TaskTypeId(v) => data.task_type_id = v,
            FieldUpdate::AssignmentDate(v) => data.assignment_date = v,
            FieldUpdate::ExpectedEndDate(v) => data.expected_end_date = v,
            FieldUpdate::RequiredDeadline(v) => data.required_deadline = v,
            FieldUpdate::IsRecurring(v) => data.is_recurring = v,
            FieldUpdate::RecurringType(v) => data.recurring_type = v,
            FieldUpdate::RecurringInterval(v) => data.recurring_interval = v,
            FieldUpdate::RecurringStartDate(v) => data.recurring_start_date = v,
            FieldUpdate::RecurringEndDate(v) => data.recurring_end_date = v,
            FieldUpdate::IsLeadershipDirection(v) => data.is_leadership_direction = v,
            FieldUpdate::Attachments(v) => data.attachments = v,
            FieldUpdate::LabelIds(v) => data.label_ids = dedup_labels(v),
        }
    }

    /// Parse command-line text into a typed edit for `field`.
    pub fn parse(field: FormField, raw: &str) -> Result<FieldUpdate, String> {
        let text = raw.to_string();
        let update = match field {
            FormField::Title => FieldUpdate::Title(text),
            FormField::Description => FieldUpdate::Description(text),
            FormField::ExpectedResults => FieldUpdate::ExpectedResults(text),
            FormField::Priority => FieldUpdate::Priority(
                parse_priority(raw).ok_or_else(|| format!("Unknown priority '{}'", raw))?,
            ),
            FormField::AssigneeId => FieldUpdate::AssigneeId(text),
            FormField::UnitId => FieldUpdate::UnitId(text),
            FormField::CollaboratingUnitId => FieldUpdate::CollaboratingUnitId(text),
            FormField::AssignmentReferenceId => FieldUpdate::AssignmentReferenceId(text),
            FormField::TopicId => FieldUpdate::TopicId(text),
            FormField::FunctionalGroupId => FieldUpdate::FunctionalGroupId(text),
            FormField::TaskTypeId => FieldUpdate::TaskTypeId(text),
            FormField::AssignmentDate => FieldUpdate::AssignmentDate(text),
            FormField::ExpectedEndDate => FieldUpdate::ExpectedEndDate(text),
            FormField::RequiredDeadline => FieldUpdate::RequiredDeadline(text),
            FormField::IsRecurring => FieldUpdate::IsRecurring(parse_flag(raw)?),
            FormField::RecurringType => FieldUpdate::RecurringType(parse_recurring_type(raw)?),
            FormField::RecurringInterval => {
                let trimmed = raw.trim();
                let interval = if trimmed.is_empty() || trimmed == "-" {
                    None
                } else {
                    Some(
                        trimmed
                            .parse::<u32>()
                            .map_err(|_| format!("Invalid interval '{}'", raw))?,
                    )
                };
                FieldUpdate::RecurringInterval(interval)
            }
            FormField::RecurringStartDate => FieldUpdate::RecurringStartDate(text),
            FormField::RecurringEndDate => FieldUpdate::RecurringEndDate(text),
            FormField::IsLeadershipDirection => {
                FieldUpdate::IsLeadershipDirection(parse_flag(raw)?)
            }
            FormField::Attachments => {
                return Err("Attachments are managed with the attach/detach commands".into())
            }
            FormField::LabelIds => FieldUpdate::LabelIds(
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        };
        Ok(update)
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" | "" => Ok(false),
        _ => Err(format!("Expected true/false, got '{}'", raw)),
    }
}
