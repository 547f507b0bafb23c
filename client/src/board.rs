//! Application state for the board UI.
//!
//! A [`Board`] holds read-only snapshots of the store. Each mutating call
//! goes to the store first; the snapshot only changes once the store has
//! confirmed the write, so a failed call leaves the board exactly as it was.

use chrono::{DateTime, Local, NaiveDate};
use shared::store::Result;
use shared::views::{CalendarMonth, Columns, MonthCursor, PieTally, WeeklyProgress};
use shared::{views, CompletedTask, NewTask, Store, Task, TaskId, TaskPatch, TaskStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::preferences;

pub struct Board {
    store: Arc<dyn Store>,
    tasks: Vec<Task>,
    completed: Vec<CompletedTask>,
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub recent: Vec<CompletedTask>,
    pub pie: PieTally,
    pub progress: WeeklyProgress,
}

impl Board {
    pub async fn load(store: Arc<dyn Store>) -> Result<Self> {
        let mut board = Self {
            store,
            tasks: Vec::new(),
            completed: Vec::new(),
        };
        board.refresh().await?;
        Ok(board)
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn completed(&self) -> &[CompletedTask] {
        &self.completed
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Reloads both snapshots. On failure neither snapshot changes.
    pub async fn refresh(&mut self) -> Result<()> {
        let tasks = self.store.list().await?;
        let completed = self.store.completed().await?;
        self.tasks = tasks;
        self.completed = completed;
        Ok(())
    }

    /// Refreshes after a confirmed write, falling back to patching the snapshot locally.
    async fn sync_after<F>(&mut self, patch: F)
    where
        F: FnOnce(&mut Vec<Task>, &mut Vec<CompletedTask>),
    {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "refresh after write failed; patching snapshot locally");
            patch(&mut self.tasks, &mut self.completed);
        }
    }

    pub async fn add(&mut self, fields: NewTask) -> Result<Task> {
        let task = self.store.create(fields).await?;
        info!(id = %task.id, "task added");
        let created = task.clone();
        self.sync_after(move |tasks, _| tasks.insert(0, created)).await;
        Ok(task)
    }

    pub async fn edit(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let task = self.store.update(id, patch).await?;
        let updated = task.clone();
        self.sync_after(move |tasks, _| {
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == updated.id) {
                *slot = updated;
            }
        })
        .await;
        Ok(task)
    }

    pub async fn remove(&mut self, id: TaskId) -> Result<()> {
        self.store.delete(id).await?;
        info!(%id, "task removed");
        self.sync_after(move |tasks, _| tasks.retain(|t| t.id != id)).await;
        Ok(())
    }

    pub async fn complete(&mut self, id: TaskId) -> Result<CompletedTask> {
        self.complete_at(id, Local::now()).await
    }

    pub async fn complete_at(&mut self, id: TaskId, at: DateTime<Local>) -> Result<CompletedTask> {
        let record = self.store.complete(id, at).await?;
        info!(%id, "task completed");
        let entry = record.clone();
        self.sync_after(move |tasks, completed| {
            tasks.retain(|t| t.id != id);
            completed.insert(0, entry);
        })
        .await;
        Ok(record)
    }

    pub fn columns(&self, today: NaiveDate) -> Columns {
        Columns::build(&self.tasks, today)
    }

    pub fn calendar(&self, cursor: MonthCursor, today: NaiveDate) -> CalendarMonth {
        CalendarMonth::build(cursor, &self.tasks, today)
    }

    pub fn pie(&self, today: NaiveDate) -> PieTally {
        PieTally::from_tasks(&self.tasks, today)
    }

    pub fn recently_completed(&self, today: NaiveDate) -> Vec<&CompletedTask> {
        views::recently_completed(&self.completed, today)
    }

    /// Builds the dashboard; only the weekly goal lookup touches the store.
    pub async fn dashboard(&self, today: NaiveDate) -> Result<Dashboard> {
        let goal = preferences::weekly_goal(self.store.as_ref()).await?;
        Ok(Dashboard {
            recent: self.recently_completed(today).into_iter().cloned().collect(),
            pie: self.pie(today),
            progress: WeeklyProgress::new(&self.completed, today, goal),
        })
    }
}
