//! Conversion of older goal documents into the flat goal list.
//!
//! Two legacy shapes exist:
//! - nested `{subject: {goal_type: [goal | string]}}` objects;
//! - lists whose items use `goal`/`title`/`description` for the text and
//!   `goal_type`/`type` for the horizon.
//!
//! Items that cannot be converted are reported in `skipped`; nothing is
//! invented to fill them.

use crate::model::goal::{Goal, GoalHorizon, GoalStatus};
use chrono::NaiveDate;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoalMigration {
    pub goals: Vec<Goal>,
    /// Human-readable reason per dropped item.
    pub skipped: Vec<String>,
}

/// True when `value` is not already a list of current-format goals.
pub fn needs_migration(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items
            .iter()
            .any(|item| serde_json::from_value::<Goal>(item.clone()).is_err()),
        _ => false,
    }
}

pub fn migrate_goals(value: &Value) -> GoalMigration {
    let mut migration = GoalMigration::default();
    match value {
        Value::Object(subjects) => {
            for (subject, by_type) in subjects {
                let Value::Object(by_type) = by_type else {
                    migration
                        .skipped
                        .push(format!("{subject}: expected goal-type map"));
                    continue;
                };
                for (goal_type, entries) in by_type {
                    let Value::Array(entries) = entries else {
                        migration
                            .skipped
                            .push(format!("{subject}/{goal_type}: expected goal list"));
                        continue;
                    };
                    for entry in entries {
                        push_converted(&mut migration, Some(subject), Some(goal_type), entry);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Ok(goal) = serde_json::from_value::<Goal>(item.clone()) {
                    migration.goals.push(goal);
                    continue;
                }
                let fields = item.as_object();
                let subject = fields.and_then(|map| first_str(map, &["subject", "course"]));
                let goal_type = fields.and_then(|map| first_str(map, &["goal_type", "type"]));
                push_converted(&mut migration, subject, goal_type, item);
            }
        }
        Value::Null => {}
        other => migration
            .skipped
            .push(format!("unsupported goal document type: {}", type_name(other))),
    }
    migration
}

fn push_converted(
    migration: &mut GoalMigration,
    subject: Option<&str>,
    goal_type: Option<&str>,
    entry: &Value,
) {
    match convert_entry(subject, goal_type, entry) {
        Ok(goal) => migration.goals.push(goal),
        Err(reason) => migration.skipped.push(reason),
    }
}

fn convert_entry(
    subject: Option<&str>,
    goal_type: Option<&str>,
    entry: &Value,
) -> Result<Goal, String> {
    let subject = subject.ok_or_else(|| "goal without subject".to_string())?;
    let (text, deadline, status) = match entry {
        Value::String(text) => (text.as_str(), None, None),
        Value::Object(fields) => (
            first_str(fields, &["goal", "title", "description", "text"]).unwrap_or(""),
            first_str(fields, &["deadline"]),
            first_str(fields, &["status"]),
        ),
        other => return Err(format!("{subject}: unsupported goal entry {}", type_name(other))),
    };

    let horizon = parse_horizon(goal_type);
    let mut goal =
        Goal::new(subject, horizon, text).map_err(|err| format!("{subject}: {err}"))?;
    goal.id = Goal::content_id(subject, horizon, text);
    if let Some(raw) = deadline.map(str::trim).filter(|raw| !raw.is_empty()) {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| format!("{subject}: invalid deadline `{raw}`"))?;
        goal = goal.with_deadline(date);
    }
    goal.status = parse_status(status);
    Ok(goal)
}

fn first_str<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
}

fn parse_horizon(value: Option<&str>) -> GoalHorizon {
    match value.map(str::trim) {
        Some("long_term" | "long" | "長期") => GoalHorizon::LongTerm,
        _ => GoalHorizon::ShortTerm,
    }
}

fn parse_status(value: Option<&str>) -> GoalStatus {
    match value.map(str::trim) {
        Some("achieved" | "達成" | "達成済み") => GoalStatus::Achieved,
        Some("abandoned" | "中止") => GoalStatus::Abandoned,
        _ => GoalStatus::InProgress,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{migrate_goals, needs_migration};
    use crate::model::goal::{GoalHorizon, GoalStatus};
    use serde_json::json;

    #[test]
    fn nested_document_is_flattened() {
        let legacy = json!({
            "Math": {
                "短期": ["Finish chapter 3", {"goal": "Score 80", "deadline": "2024-07-01", "status": "達成"}],
                "長期": [{"goal": "Pass the entrance exam"}]
            }
        });
        assert!(needs_migration(&legacy));
        let migration = migrate_goals(&legacy);
        assert!(migration.skipped.is_empty());
        assert_eq!(migration.goals.len(), 3);

        let achieved = migration
            .goals
            .iter()
            .find(|goal| goal.text == "Score 80")
            .expect("converted goal with deadline");
        assert_eq!(achieved.status, GoalStatus::Achieved);
        assert_eq!(achieved.horizon, GoalHorizon::ShortTerm);
        assert!(achieved.deadline.is_some());

        let long = migration
            .goals
            .iter()
            .find(|goal| goal.horizon == GoalHorizon::LongTerm)
            .expect("converted long-term goal");
        assert_eq!(long.subject, "Math");

        let again = migrate_goals(&legacy);
        assert_eq!(again.goals, migration.goals);
    }

    #[test]
    fn unconvertible_items_are_reported() {
        let legacy = json!([
            {"subject": "English", "goal_type": "short_term", "title": "Read a novel"},
            {"goal": "No subject here"},
            {"subject": "Science", "goal": "Lab report", "deadline": "next week"}
        ]);
        let migration = migrate_goals(&legacy);
        assert_eq!(migration.goals.len(), 1);
        assert_eq!(migration.skipped.len(), 2);
    }

    #[test]
    fn current_format_passes_through() {
        let current = json!([{
            "id": "0b7ad3a4-58a4-4f42-8e5f-3f1f0e8f8c11",
            "subject": "Math",
            "horizon": "long_term",
            "text": "Master calculus",
            "deadline": "",
            "status": "in_progress"
        }]);
        assert!(!needs_migration(&current));
        let migration = migrate_goals(&current);
        assert_eq!(migration.goals.len(), 1);
        assert_eq!(migration.goals[0].id.to_string(), "0b7ad3a4-58a4-4f42-8e5f-3f1f0e8f8c11");
    }
}
