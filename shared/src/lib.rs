use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod due;
pub mod local;
pub mod store;
pub mod views;

pub use due::DueStatus;
pub use store::{SettingsStore, Store, StoreError, TaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    Medium,
    #[default]
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub urgency: Urgency,
    /// `YYYY-MM-DD` as entered; parsed lazily so bad text only affects classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub urgency: Urgency,
    pub due_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// History entry written when a task is marked done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    #[serde(flatten)]
    pub task: Task,
    pub completed_at: DateTime<Local>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingValue {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// JSON payload carried by every non-success API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Machine-readable reason, set when clients must tell the case apart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    /// Code carried by the 404 for a settings key that was never saved.
    pub const SETTING_NOT_FOUND: &'static str = "setting_not_found";

    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn is_unset_setting(&self) -> bool {
        self.code.as_deref() == Some(Self::SETTING_NOT_FOUND)
    }
}

impl NewTask {
    pub fn new(title: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            urgency: Urgency::default(),
            due_date: due_date.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }
        if self.due_date.trim().is_empty() {
            return Err(StoreError::Validation("due date is required".to_string()));
        }
        Ok(())
    }
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), StoreError> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(StoreError::Validation("title cannot be blank".to_string()));
        }
        if matches!(&self.due_date, Some(due) if due.trim().is_empty()) {
            return Err(StoreError::Validation("due date cannot be blank".to_string()));
        }
        Ok(())
    }
}

impl Task {
    pub fn new(id: TaskId, fields: NewTask) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            urgency: fields.urgency,
            due_date: Some(fields.due_date),
        }
    }

    /// Merges the supplied fields; the id never changes.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(urgency) = patch.urgency {
            self.urgency = urgency;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date.as_deref().and_then(due::parse_local_date)
    }

    pub fn status(&self, today: NaiveDate) -> DueStatus {
        due::classify(self.due(), today)
    }

    pub fn complete(self, completed_at: DateTime<Local>) -> CompletedTask {
        CompletedTask {
            task: self,
            completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_keeps_unsupplied_fields() {
        let mut task = Task::new(
            TaskId(3),
            NewTask::new("Write report", "2024-03-01")
                .with_description("quarterly")
                .with_urgency(Urgency::High),
        );
        task.apply(TaskPatch {
            title: Some("Write final report".to_string()),
            ..TaskPatch::default()
        });

        assert_eq!(task.id, TaskId(3));
        assert_eq!(task.title, "Write final report");
        assert_eq!(task.description, "quarterly");
        assert_eq!(task.urgency, Urgency::High);
        assert_eq!(task.due_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn new_task_requires_title_and_due_date() {
        assert!(NewTask::new("  ", "2024-03-01").validate().is_err());
        assert!(NewTask::new("Call bank", "").validate().is_err());
        assert!(NewTask::new("Call bank", "2024-03-01").validate().is_ok());
    }

    #[test]
    fn blank_title_patch_is_rejected() {
        let patch = TaskPatch {
            title: Some(String::new()),
            ..TaskPatch::default()
        };
        assert!(matches!(patch.validate(), Err(StoreError::Validation(_))));
        assert!(TaskPatch::default().validate().is_ok());
    }

    #[test]
    fn blank_due_date_patch_is_rejected() {
        let patch = TaskPatch {
            due_date: Some("  ".to_string()),
            ..TaskPatch::default()
        };
        assert!(matches!(patch.validate(), Err(StoreError::Validation(_))));

        let patch = TaskPatch {
            due_date: Some("2024-04-01".to_string()),
            ..TaskPatch::default()
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn error_body_code_is_optional() {
        let plain: ErrorBody = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(!plain.is_unset_setting());
        assert_eq!(serde_json::to_value(&plain).unwrap(), serde_json::json!({"error": "boom"}));

        let unset = ErrorBody::new("not set").with_code(ErrorBody::SETTING_NOT_FOUND);
        let json = serde_json::to_string(&unset).unwrap();
        assert!(serde_json::from_str::<ErrorBody>(&json).unwrap().is_unset_setting());
    }

    #[test]
    fn completed_record_flattens_task_fields() {
        let task = Task::new(TaskId(7), NewTask::new("Pay rent", "2024-03-05"));
        let record = task.complete(Local::now());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "Pay rent");
        assert!(json.get("completed_at").is_some());
    }

    #[test]
    fn urgency_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Urgency::Medium).unwrap(), "\"medium\"");
        let parsed: Urgency = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, Urgency::High);
    }
}
