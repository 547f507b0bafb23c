//! Redis persistence.
//!
//! Layout: one `task:{id}` string per task, ids from the `tasks:next_id`
//! counter, completion history in the `tasks:completed` list (newest at the
//! head) and settings as JSON strings in the `settings` hash.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use serde_json::Value;
use shared::store::{Result, SettingsStore, StoreError, TaskStore};
use shared::{CompletedTask, NewTask, Task, TaskId, TaskPatch};
use tracing::warn;

const TASK_PATTERN: &str = "task:*";
const NEXT_ID_KEY: &str = "tasks:next_id";
const COMPLETED_KEY: &str = "tasks:completed";
const SETTINGS_KEY: &str = "settings";

fn task_key(id: TaskId) -> String {
    format!("task:{}", id)
}

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn decode<T: serde::de::DeserializeOwned>(what: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(format!("{what}: {e}")))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(unavailable)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)
    }

    async fn load_task(&self, conn: &mut MultiplexedConnection, id: TaskId) -> Result<Task> {
        let key = task_key(id);
        let raw: Option<String> = conn.get(&key).await.map_err(unavailable)?;
        match raw {
            Some(json) => decode(&key, &json),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

#[async_trait]
impl TaskStore for RedisStore {
    async fn list(&self) -> Result<Vec<Task>> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = conn.keys(TASK_PATTERN).await.map_err(unavailable)?;

        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = conn.get(&key).await.map_err(unavailable)?;
            // Deleted between KEYS and GET.
            let Some(json) = raw else { continue };
            match serde_json::from_str::<Task>(&json) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(%key, error = %e, "skipping unreadable task"),
            }
        }
        // Ids come from a counter, so the highest id is the newest task.
        tasks.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(tasks)
    }

    async fn create(&self, fields: NewTask) -> Result<Task> {
        fields.validate()?;
        let mut conn = self.conn().await?;
        let id: u64 = conn.incr(NEXT_ID_KEY, 1u64).await.map_err(unavailable)?;
        let task = Task::new(TaskId(id), fields);
        let _: () = conn
            .set(task_key(task.id), encode(&task)?)
            .await
            .map_err(unavailable)?;
        Ok(task)
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        patch.validate()?;
        let mut conn = self.conn().await?;
        let mut task = self.load_task(&mut conn, id).await?;
        task.apply(patch);
        let _: () = conn
            .set(task_key(id), encode(&task)?)
            .await
            .map_err(unavailable)?;
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        let mut conn = self.conn().await?;
        let deleted: usize = conn.del(task_key(id)).await.map_err(unavailable)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn complete(&self, id: TaskId, completed_at: DateTime<Local>) -> Result<CompletedTask> {
        let mut conn = self.conn().await?;
        let record = self.load_task(&mut conn, id).await?.complete(completed_at);
        let json = encode(&record)?;
        // MULTI/EXEC: the task leaves the board and enters history together.
        let _: () = redis::pipe()
            .atomic()
            .del(task_key(id))
            .ignore()
            .lpush(COMPLETED_KEY, json)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(record)
    }

    async fn completed(&self) -> Result<Vec<CompletedTask>> {
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn.lrange(COMPLETED_KEY, 0, -1).await.map_err(unavailable)?;
        Ok(raw
            .iter()
            .filter_map(|json| match serde_json::from_str(json) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable completed record");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl SettingsStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.hget(SETTINGS_KEY, key).await.map_err(unavailable)?;
        raw.map(|json| decode(key, &json)).transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .hset(SETTINGS_KEY, key, encode(&value)?)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.hdel(SETTINGS_KEY, key).await.map_err(unavailable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_keys_do_not_collide_with_bookkeeping_keys() {
        let pattern = TASK_PATTERN.trim_end_matches('*');
        assert_eq!(task_key(TaskId(12)), "task:12");
        assert!(task_key(TaskId(12)).starts_with(pattern));
        assert!(!NEXT_ID_KEY.starts_with(pattern));
        assert!(!COMPLETED_KEY.starts_with(pattern));
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(matches!(
            RedisStore::open("not a url"),
            Err(StoreError::Unavailable(_))
        ));
    }

    /// Needs a disposable Redis at `REDIS_URL`; it writes real keys.
    #[tokio::test]
    #[ignore]
    async fn live_round_trip() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let store = RedisStore::open(&url).unwrap();

        let task = store
            .create(NewTask::new("Live", "2024-03-01"))
            .await
            .unwrap();
        assert_eq!(store.list().await.unwrap()[0].id, task.id);

        let record = store.complete(task.id, Local::now()).await.unwrap();
        assert_eq!(record.task.id, task.id);
        assert!(matches!(store.delete(task.id).await, Err(StoreError::NotFound(_))));

        store.set("weeklyGoal", Value::from(4)).await.unwrap();
        assert_eq!(store.get("weeklyGoal").await.unwrap(), Some(Value::from(4)));
        store.remove("weeklyGoal").await.unwrap();
        assert_eq!(store.get("weeklyGoal").await.unwrap(), None);
    }
}
