//! Validation rules for the task-creation form.
//!
//! Every rule is checked independently; the result is the complete error map
//! for the current data, never a first-failure short circuit.

use chrono::{DateTime, NaiveDate};

use crate::fields::FormField;
use crate::form::{TaskFormData, TaskFormErrors};

/// Run every rule over `data` and return the resulting error map.
pub fn validate(data: &TaskFormData) -> TaskFormErrors {
    let mut errors = TaskFormErrors::new();

    if data.title.trim().is_empty() {
        errors.insert(FormField::Title, "Title is required".into());
    }
    let required = [
        (FormField::TopicId, &data.topic_id, "Topic is required"),
        (FormField::UnitId, &data.unit_id, "Unit is required"),
        (FormField::AssigneeId, &data.assignee_id, "Assignee is required"),
        (FormField::AssignmentDate, &data.assignment_date, "Assignment date is required"),
        (FormField::RequiredDeadline, &data.required_deadline, "Required deadline is required"),
    ];
    for (field, value, message) in required {
        if value.is_empty() {
            errors.insert(field, message.into());
        }
    }

    if !data.assignment_date.is_empty()
        && !data.expected_end_date.is_empty()
        && precedes(&data.expected_end_date, &data.assignment_date)
    {
        errors.insert(
            FormField::ExpectedEndDate,
            "Expected end date cannot precede assignment date".into(),
        );
    }
    if !data.assignment_date.is_empty()
        && !data.required_deadline.is_empty()
        && precedes(&data.required_deadline, &data.assignment_date)
    {
        errors.insert(
            FormField::RequiredDeadline,
            "Required deadline cannot precede assignment date".into(),
        );
    }

    errors
}

/// True when `later` falls on a calendar day strictly before `earlier`.
/// Unparseable dates never fail the ordering rule.
fn precedes(later: &str, earlier: &str) -> bool {
    match (parse_calendar_date(later), parse_calendar_date(earlier)) {
        (Some(l), Some(e)) => l < e,
        _ => false,
    }
}

/// Parse an ISO date or date-time string down to its calendar date.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
