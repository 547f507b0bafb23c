//! Storage contracts shared by every backend.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::Value;

use crate::{CompletedTask, NewTask, Task, TaskId, TaskPatch};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("invalid input: {0}")]
    Validation(String),

    /// Network or storage failure; the operation was not applied.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Task persistence. Every call is a single-record unit of work.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All active tasks, most recently created first.
    async fn list(&self) -> Result<Vec<Task>>;

    async fn create(&self, fields: NewTask) -> Result<Task>;

    async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task>;

    /// Fails with [`StoreError::NotFound`] when the id is absent.
    async fn delete(&self, id: TaskId) -> Result<()>;

    /// Removes the task and appends it to the history in one step.
    async fn complete(&self, id: TaskId, completed_at: DateTime<Local>) -> Result<CompletedTask>;

    /// Completion history, most recent first.
    async fn completed(&self) -> Result<Vec<CompletedTask>>;
}

/// Opaque key/value preferences. `None` means unset, which differs from `Some(Value::Null)`.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// A backend serving both tasks and settings.
pub trait Store: TaskStore + SettingsStore {}

impl<T: TaskStore + SettingsStore> Store for T {}
