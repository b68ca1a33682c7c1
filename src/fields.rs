//! Enumerations and field types for the task-creation form.
//!
//! This module defines the small vocabularies used by the form: the form's own
//! priority scale, recurrence kinds, and the names of every form field.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority as chosen on the creation form.
///
/// This is not the task list's `low/medium/high/urgent` scale. The two are kept
/// apart and the submit payload carries this one unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FormPriority {
    #[default]
    Normal,
    Important,
    VeryImportant,
}

/// How often a recurring task repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RecurringType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Every field of `TaskFormData`, used as the key space for validation errors.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Title,
    Description,
    ExpectedResults,
    Priority,
    AssigneeId,
    UnitId,
    CollaboratingUnitId,
    AssignmentReferenceId,
    TopicId,
    FunctionalGroupId,
    TaskTypeId,
    AssignmentDate,
    ExpectedEndDate,
    RequiredDeadline,
    IsRecurring,
    RecurringType,
    RecurringInterval,
    RecurringStartDate,
    RecurringEndDate,
    IsLeadershipDirection,
    Attachments,
    LabelIds,
}

impl FormField {
    /// Wire name of the field, as it appears in stored JSON and error maps.
    pub fn as_str(self) -> &'static str {
        match self {
            FormField::Title => "title",
            FormField::Description => "description",
            FormField::ExpectedResults => "expectedResults",
            FormField::Priority => "priority",
            FormField::AssigneeId => "assigneeId",
            FormField::UnitId => "unitId",
            FormField::CollaboratingUnitId => "collaboratingUnitId",
            FormField::AssignmentReferenceId => "assignmentReferenceId",
            FormField::TopicId => "topicId",
            FormField::FunctionalGroupId => "functionalGroupId",
            FormField::TaskTypeId => "taskTypeId",
            FormField::AssignmentDate => "assignmentDate",
            FormField::ExpectedEndDate => "expectedEndDate",
            FormField::RequiredDeadline => "requiredDeadline",
            FormField::IsRecurring => "isRecurring",
            FormField::RecurringType => "recurringType",
            FormField::RecurringInterval => "recurringInterval",
            FormField::RecurringStartDate => "recurringStartDate",
            FormField::RecurringEndDate => "recurringEndDate",
            FormField::IsLeadershipDirection => "isLeadershipDirection",
            FormField::Attachments => "attachments",
            FormField::LabelIds => "labelIds",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a field name in either its wire form (`assigneeId`) or CLI form (`assignee-id`).
pub fn parse_field(name: &str) -> Result<FormField, String> {
    let name = name.trim();
    if let Some(field) = FormField::value_variants()
        .iter()
        .copied()
        .find(|f| f.as_str().eq_ignore_ascii_case(name))
    {
        return Ok(field);
    }
    FormField::from_str(name, true).map_err(|_| format!("Unknown field '{}'", name))
}

/// Format a form priority for display.
pub fn format_priority(p: FormPriority) -> &'static str {
    match p {
        FormPriority::Normal => "Normal",
        FormPriority::Important => "Important",
        FormPriority::VeryImportant => "Very Important",
    }
}

/// Format a recurrence kind for display.
pub fn format_recurring_type(r: Option<RecurringType>) -> &'static str {
    match r {
        Some(RecurringType::Daily) => "Daily",
        Some(RecurringType::Weekly) => "Weekly",
        Some(RecurringType::Monthly) => "Monthly",
        Some(RecurringType::Yearly) => "Yearly",
        None => "-",
    }
}

/// Parse a priority string as typed on the command line.
pub fn parse_priority(s: &str) -> Option<FormPriority> {
    match s.trim().to_lowercase().as_str() {
        "normal" => Some(FormPriority::Normal),
        "important" => Some(FormPriority::Important),
        "very-important" | "very important" => Some(FormPriority::VeryImportant),
        _ => None,
    }
}

/// Parse a recurrence kind; `-` or an empty string clears it.
pub fn parse_recurring_type(s: &str) -> Result<Option<RecurringType>, String> {
    match s.trim().to_lowercase().as_str() {
        "" | "-" => Ok(None),
        "daily" => Ok(Some(RecurringType::Daily)),
        "weekly" => Ok(Some(RecurringType::Weekly)),
        "monthly" => Ok(Some(RecurringType::Monthly)),
        "yearly" => Ok(Some(RecurringType::Yearly)),
        other => Err(format!("Unknown recurring type '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_wire_names_match_serde() {
        for field in FormField::value_variants() {
            let json = serde_json::to_string(field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn field_names_parse_in_both_forms() {
        assert_eq!(parse_field("assigneeId"), Ok(FormField::AssigneeId));
        assert_eq!(parse_field("assignee-id"), Ok(FormField::AssigneeId));
        assert_eq!(parse_field("TITLE"), Ok(FormField::Title));
        assert!(parse_field("owner").is_err());
    }

    #[test]
    fn priority_uses_form_vocabulary() {
        assert_eq!(
            serde_json::to_string(&FormPriority::VeryImportant).unwrap(),
            "\"very-important\""
        );
        assert_eq!(parse_priority("Important"), Some(FormPriority::Important));
        assert_eq!(parse_priority("urgent"), None);
    }

    #[test]
    fn recurring_type_dash_clears() {
        assert_eq!(parse_recurring_type("-"), Ok(None));
        assert_eq!(parse_recurring_type("Weekly"), Ok(Some(RecurringType::Weekly)));
        assert!(parse_recurring_type("hourly").is_err());
    }
}
