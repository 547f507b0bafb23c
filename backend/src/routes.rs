use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    CompleteTaskRequest, CompletedTask, NewTask, SettingValue, SettingsStore, Task, TaskId,
    TaskPatch, TaskStore,
};
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct SettingBody {
    #[serde(default)]
    pub value: Value,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn task_id(path: Result<Path<u64>, PathRejection>) -> Result<TaskId, ApiError> {
    path.map(|Path(id)| TaskId(id))
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Vec<Task>> {
    Ok(Json(state.store.list().await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<Task> {
    let task = state.store.create(body(payload)?).await?;
    info!(id = %task.id, "task created");
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Task> {
    let id = task_id(id)?;
    Ok(Json(state.store.update(id, body(payload)?).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Value> {
    let id = task_id(id)?;
    state.store.delete(id).await?;
    info!(%id, "task deleted");
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

/// The body is optional; without `completed_at` the server clock is used.
pub async fn complete_task(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    raw: Bytes,
) -> ApiResult<CompletedTask> {
    let id = task_id(id)?;
    let request: CompleteTaskRequest = if raw.iter().all(u8::is_ascii_whitespace) {
        CompleteTaskRequest::default()
    } else {
        serde_json::from_slice(&raw).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let completed_at = request.completed_at.unwrap_or_else(Local::now);
    let record = state.store.complete(id, completed_at).await?;
    info!(%id, "task completed");
    Ok(Json(record))
}

pub async fn list_completed(State(state): State<AppState>) -> ApiResult<Vec<CompletedTask>> {
    Ok(Json(state.store.completed().await?))
}

pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<SettingValue> {
    match state.store.get(&key).await? {
        Some(value) => Ok(Json(SettingValue { key, value })),
        None => Err(ApiError::SettingNotFound(key)),
    }
}

pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    payload: Result<Json<SettingBody>, JsonRejection>,
) -> ApiResult<SettingValue> {
    let SettingBody { value } = body(payload)?;
    state.store.set(&key, value.clone()).await?;
    Ok(Json(SettingValue { key, value }))
}

pub async fn save_setting(
    State(state): State<AppState>,
    payload: Result<Json<SettingValue>, JsonRejection>,
) -> ApiResult<SettingValue> {
    let setting = body(payload)?;
    if setting.key.trim().is_empty() {
        return Err(ApiError::BadRequest("Setting key is required".to_string()));
    }
    state.store.set(&setting.key, setting.value.clone()).await?;
    Ok(Json(setting))
}

pub async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Value> {
    state.store.remove(&key).await?;
    Ok(Json(json!({ "message": "Setting deleted successfully" })))
}
