//! Local backend: whole-collection JSON blobs in a key/value medium.
//!
//! Every mutation loads the full collection, changes it and writes it back.
//! Operations that touch two collections (completing a task) go through
//! [`Medium::write_all`], which media must apply atomically.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::store::{Result, SettingsStore, StoreError, TaskStore};
use crate::{CompletedTask, NewTask, Task, TaskId, TaskPatch};

pub const TASKS_KEY: &str = "todo_tasks_v1";
pub const COMPLETED_KEY: &str = "todo_completed_v1";
pub const SETTINGS_KEY: &str = "todo_settings_v1";

/// Raw string storage beneath [`LocalStore`].
pub trait Medium: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Writes every entry or none of them.
    fn write_all(&self, entries: Vec<(&str, String)>) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory medium lock poisoned".to_string()))
    }
}

impl Medium for MemoryMedium {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn write_all(&self, entries: Vec<(&str, String)>) -> Result<()> {
        let mut map = self.entries()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// A single JSON file holding every key, replaced wholesale on each write.
///
/// Reads and writes are blocking `std::fs` calls made on the calling task.
/// The file holds one user's board, so each call is a few small-file syscalls.
#[derive(Debug)]
pub struct FileMedium {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileMedium {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                StoreError::Corrupt(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(unavailable(&self.path, e)),
        }
    }
}

fn unavailable(path: &Path, e: io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {e}", path.display()))
}

impl Medium for FileMedium {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Unavailable("file medium lock poisoned".to_string()))?;
        Ok(self.load()?.remove(key))
    }

    fn write_all(&self, entries: Vec<(&str, String)>) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Unavailable("file medium lock poisoned".to_string()))?;
        let mut map = self.load()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }
        let text = serde_json::to_string(&map).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| unavailable(parent, e))?;
        }
        // Rename is atomic on one filesystem, so readers never see half a file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text).map_err(|e| unavailable(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| unavailable(&self.path, e))
    }
}

pub struct LocalStore<M> {
    medium: M,
    // Serializes read-modify-write cycles inside this process.
    lock: Mutex<()>,
}

impl LocalStore<MemoryMedium> {
    pub fn in_memory() -> Self {
        Self::new(MemoryMedium::new())
    }
}

impl LocalStore<FileMedium> {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(FileMedium::new(path))
    }
}

impl<M: Medium> LocalStore<M> {
    pub fn new(medium: M) -> Self {
        Self {
            medium,
            lock: Mutex::new(()),
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| StoreError::Unavailable("local store lock poisoned".to_string()))
    }

    /// Loads a collection for display; an unreadable blob is logged and treated as empty.
    fn load_lenient<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.load_strict(key) {
            Err(StoreError::Corrupt(reason)) => {
                warn!(key, %reason, "ignoring unreadable local collection");
                Ok(T::default())
            }
            other => other,
        }
    }

    /// Loads a collection for mutation; corrupt data is an error so it is never overwritten.
    fn load_strict<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.medium.read(key)? {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Corrupt(format!("{key}: {e}"))),
        }
    }

    fn create_sync(&self, fields: NewTask) -> Result<Task> {
        fields.validate()?;
        let _guard = self.guard()?;
        let mut tasks: Vec<Task> = self.load_strict(TASKS_KEY)?;
        let task = Task::new(next_id(&tasks), fields);
        tasks.insert(0, task.clone());
        self.medium.write_all(vec![(TASKS_KEY, encode(&tasks)?)])?;
        debug!(id = %task.id, "created local task");
        Ok(task)
    }

    fn update_sync(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        patch.validate()?;
        let _guard = self.guard()?;
        let mut tasks: Vec<Task> = self.load_strict(TASKS_KEY)?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        task.apply(patch);
        let updated = task.clone();
        self.medium.write_all(vec![(TASKS_KEY, encode(&tasks)?)])?;
        Ok(updated)
    }

    fn delete_sync(&self, id: TaskId) -> Result<()> {
        let _guard = self.guard()?;
        let mut tasks: Vec<Task> = self.load_strict(TASKS_KEY)?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.medium.write_all(vec![(TASKS_KEY, encode(&tasks)?)])
    }

    fn complete_sync(&self, id: TaskId, completed_at: DateTime<Local>) -> Result<CompletedTask> {
        let _guard = self.guard()?;
        let mut tasks: Vec<Task> = self.load_strict(TASKS_KEY)?;
        let idx = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let mut history: Vec<CompletedTask> = self.load_strict(COMPLETED_KEY)?;
        let record = tasks.remove(idx).complete(completed_at);
        history.insert(0, record.clone());
        self.medium.write_all(vec![
            (TASKS_KEY, encode(&tasks)?),
            (COMPLETED_KEY, encode(&history)?),
        ])?;
        debug!(%id, "completed local task");
        Ok(record)
    }

    fn update_settings<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self.guard()?;
        let mut settings: Map<String, Value> = self.load_strict(SETTINGS_KEY)?;
        change(&mut settings);
        self.medium.write_all(vec![(SETTINGS_KEY, encode(&settings)?)])
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// One past the highest id in use, or a millisecond timestamp if that overflows.
fn next_id(tasks: &[Task]) -> TaskId {
    tasks
        .iter()
        .map(|t| t.id.0)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .map(TaskId)
        .unwrap_or_else(|| TaskId(Utc::now().timestamp_millis().unsigned_abs()))
}

#[async_trait]
impl<M: Medium> TaskStore for LocalStore<M> {
    async fn list(&self) -> Result<Vec<Task>> {
        self.load_lenient(TASKS_KEY)
    }

    async fn create(&self, fields: NewTask) -> Result<Task> {
        self.create_sync(fields)
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        self.update_sync(id, patch)
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        self.delete_sync(id)
    }

    async fn complete(&self, id: TaskId, completed_at: DateTime<Local>) -> Result<CompletedTask> {
        self.complete_sync(id, completed_at)
    }

    async fn completed(&self) -> Result<Vec<CompletedTask>> {
        self.load_lenient(COMPLETED_KEY)
    }
}

#[async_trait]
impl<M: Medium> SettingsStore for LocalStore<M> {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut settings: Map<String, Value> = self.load_lenient(SETTINGS_KEY)?;
        Ok(settings.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.update_settings(|settings| {
            settings.insert(key.to_string(), value);
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.update_settings(|settings| {
            settings.remove(key);
        })
    }
}
