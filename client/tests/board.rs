use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use client::preferences;
use client::Board;
use serde_json::Value;
use shared::local::{LocalStore, MemoryMedium};
use shared::store::Result;
use shared::views::MonthCursor;
use shared::{
    CompletedTask, DueStatus, NewTask, SettingsStore, StoreError, Task, TaskId, TaskPatch,
    TaskStore, Urgency,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Local store whose reads or writes can be switched off.
struct Flaky {
    inner: LocalStore<MemoryMedium>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl Flaky {
    fn new() -> Self {
        Self {
            inner: LocalStore::in_memory(),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    fn check(&self, flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskStore for Flaky {
    async fn list(&self) -> Result<Vec<Task>> {
        self.check(&self.fail_reads)?;
        self.inner.list().await
    }

    async fn create(&self, fields: NewTask) -> Result<Task> {
        self.check(&self.fail_writes)?;
        self.inner.create(fields).await
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        self.check(&self.fail_writes)?;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        self.check(&self.fail_writes)?;
        self.inner.delete(id).await
    }

    async fn complete(&self, id: TaskId, at: DateTime<Local>) -> Result<CompletedTask> {
        self.check(&self.fail_writes)?;
        self.inner.complete(id, at).await
    }

    async fn completed(&self) -> Result<Vec<CompletedTask>> {
        self.check(&self.fail_reads)?;
        self.inner.completed().await
    }
}

#[async_trait]
impl SettingsStore for Flaky {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.check(&self.fail_reads)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.check(&self.fail_writes)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check(&self.fail_writes)?;
        self.inner.remove(key).await
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn noon(day: NaiveDate) -> DateTime<Local> {
    Local
        .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
        .earliest()
        .unwrap()
}

#[tokio::test]
async fn mutations_refresh_the_snapshot() {
    let mut board = Board::load(Arc::new(LocalStore::in_memory())).await.unwrap();
    assert!(board.tasks().is_empty());

    let first = board.add(NewTask::new("First", "2024-03-01")).await.unwrap();
    let second = board
        .add(NewTask::new("Second", "2024-03-09").with_urgency(Urgency::High))
        .await
        .unwrap();
    assert_eq!(board.tasks(), &[second.clone(), first.clone()]);

    let patch = TaskPatch {
        description: Some("with notes".to_string()),
        ..TaskPatch::default()
    };
    board.edit(first.id, patch).await.unwrap();
    assert_eq!(board.task(first.id).unwrap().description, "with notes");
    assert_eq!(board.task(first.id).unwrap().title, "First");

    board.remove(second.id).await.unwrap();
    assert!(board.task(second.id).is_none());
}

#[tokio::test]
async fn complete_moves_task_to_recent_history() {
    let today = date(2024, 3, 10);
    let mut board = Board::load(Arc::new(LocalStore::in_memory())).await.unwrap();
    let task = board.add(NewTask::new("Ship it", "2024-03-09")).await.unwrap();

    let record = board.complete_at(task.id, noon(today)).await.unwrap();
    assert_eq!(record.task.id, task.id);
    assert!(board.tasks().is_empty());
    assert_eq!(board.completed().len(), 1);
    assert_eq!(board.recently_completed(today).len(), 1);
    assert!(board.recently_completed(today + Duration::days(8)).is_empty());
}

#[tokio::test]
async fn failed_write_leaves_state_unchanged() {
    let store = Arc::new(Flaky::new());
    let mut board = Board::load(store.clone()).await.unwrap();
    let task = board.add(NewTask::new("Keep", "2024-03-01")).await.unwrap();

    store.fail_writes.store(true, Ordering::SeqCst);
    assert!(board.add(NewTask::new("Lost", "2024-03-01")).await.is_err());
    assert!(board.remove(task.id).await.is_err());
    assert!(matches!(
        board.complete(task.id).await,
        Err(StoreError::Unavailable(_))
    ));

    assert_eq!(board.tasks(), &[task]);
    assert!(board.completed().is_empty());
}

#[tokio::test]
async fn failed_refresh_patches_snapshot_locally() {
    let store = Arc::new(Flaky::new());
    let mut board = Board::load(store.clone()).await.unwrap();

    store.fail_reads.store(true, Ordering::SeqCst);
    let task = board.add(NewTask::new("Offline", "2024-03-01")).await.unwrap();
    assert_eq!(board.tasks(), &[task.clone()]);

    board.complete_at(task.id, noon(date(2024, 3, 2))).await.unwrap();
    assert!(board.tasks().is_empty());
    assert_eq!(board.completed()[0].task.id, task.id);

    assert!(board.refresh().await.is_err());
    assert_eq!(board.completed().len(), 1);
}

#[tokio::test]
async fn views_agree_on_status() {
    let today = date(2024, 3, 10);
    let mut board = Board::load(Arc::new(LocalStore::in_memory())).await.unwrap();
    board
        .add(NewTask::new("Late", "2024-03-08").with_urgency(Urgency::High))
        .await
        .unwrap();
    board
        .add(NewTask::new("Soon", "2024-03-12").with_urgency(Urgency::High))
        .await
        .unwrap();
    board
        .add(NewTask::new("Later", "2024-03-25").with_urgency(Urgency::Low))
        .await
        .unwrap();

    let columns = board.columns(today);
    let high: Vec<&str> = columns.high.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(high, vec!["Late", "Soon"]);
    assert_eq!(columns.low.len(), 1);
    assert!(columns.medium.is_empty());

    let calendar = board.calendar(MonthCursor::containing(today), today);
    assert_eq!(calendar.cell(date(2024, 3, 8)).unwrap().tasks[0].status, DueStatus::Late);
    assert_eq!(calendar.cell(date(2024, 3, 12)).unwrap().tasks[0].status, DueStatus::Soon);
    assert_eq!(calendar.cell(date(2024, 3, 25)).unwrap().tasks[0].status, DueStatus::Normal);

    let pie = board.pie(today);
    assert_eq!((pie.late, pie.soon, pie.normal), (1, 1, 1));
}

#[tokio::test]
async fn dashboard_combines_history_pie_and_goal() {
    let today = date(2024, 3, 10);
    let store = Arc::new(LocalStore::in_memory());
    preferences::set_weekly_goal(store.as_ref(), 2).await.unwrap();

    let mut board = Board::load(store).await.unwrap();
    let done = board.add(NewTask::new("Done", "2024-03-09")).await.unwrap();
    board.add(NewTask::new("Open", "2024-03-30")).await.unwrap();
    board.complete_at(done.id, noon(today)).await.unwrap();

    let dashboard = board.dashboard(today).await.unwrap();
    assert_eq!(dashboard.recent.len(), 1);
    assert_eq!(dashboard.pie.total(), 1);
    assert_eq!(dashboard.progress.completed, 1);
    assert_eq!(dashboard.progress.goal, Some(2));
    assert_eq!(dashboard.progress.fraction(), Some(0.5));
}
