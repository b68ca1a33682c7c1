//! Mapping from the creation form to the task-creation request payload.

use chrono::NaiveDate;
use serde::Serialize;

use crate::fields::{FormPriority, RecurringType};
use crate::form::TaskFormData;
use crate::validation::parse_calendar_date;

/// Recurrence settings, present only for recurring tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub recurring_type: Option<RecurringType>,
    pub interval: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// An uploaded file as referenced by the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The payload handed to the task-creation collaborator.
///
/// `priority` stays on the form's normal/important/very-important scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub expected_results: Option<String>,
    pub priority: FormPriority,
    pub assignee_id: Option<String>,
    pub unit_id: Option<String>,
    pub collaborating_unit_id: Option<String>,
    pub assignment_reference_id: Option<String>,
    pub topic_id: Option<String>,
    pub functional_group_id: Option<String>,
    pub task_type_id: Option<String>,
    pub parent_task_id: Option<String>,
    pub assignment_date: Option<NaiveDate>,
    pub expected_end_date: Option<NaiveDate>,
    pub required_deadline: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub is_leadership_direction: bool,
    pub attachments: Vec<AttachmentRef>,
    pub label_ids: Vec<String>,
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn date(s: &str) -> Option<NaiveDate> {
    if s.trim().is_empty() {
        None
    } else {
        parse_calendar_date(s)
    }
}

impl CreateTaskRequest {
    /// Build the request from a (validated) form. Empty optional text becomes `None`.
    pub fn from_form(data: &TaskFormData, parent_task_id: Option<&str>) -> Self {
        let recurrence = data.is_recurring.then(|| Recurrence {
            recurring_type: data.recurring_type,
            interval: data.recurring_interval,
            start_date: date(&data.recurring_start_date),
            end_date: date(&data.recurring_end_date),
        });
        CreateTaskRequest {
            title: data.title.trim().to_string(),
            description: non_empty(&data.description),
            expected_results: non_empty(&data.expected_results),
            priority: data.priority,
            assignee_id: non_empty(&data.assignee_id),
            unit_id: non_empty(&data.unit_id),
            collaborating_unit_id: non_empty(&data.collaborating_unit_id),
            assignment_reference_id: non_empty(&data.assignment_reference_id),
            topic_id: non_empty(&data.topic_id),
            functional_group_id: non_empty(&data.functional_group_id),
            task_type_id: non_empty(&data.task_type_id),
            parent_task_id: parent_task_id.and_then(non_empty),
            assignment_date: date(&data.assignment_date),
            expected_end_date: date(&data.expected_end_date),
            required_deadline: date(&data.required_deadline),
            recurrence,
            is_leadership_direction: data.is_leadership_direction,
            attachments: data
                .attachments
                .iter()
                .map(|a| AttachmentRef {
                    id: a.id.clone(),
                    name: a.name.clone(),
                    size: a.size,
                    mime_type: a.mime_type.clone(),
                    url: a.url.clone(),
                })
                .collect(),
            label_ids: data.label_ids.clone(),
        }
    }
}
