//! Store backed by the HTTP API.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::store::{Result, SettingsStore, StoreError, TaskStore};
use shared::{
    CompleteTaskRequest, CompletedTask, ErrorBody, NewTask, SettingValue, Task, TaskId, TaskPatch,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RemoteStore {
    http: Client,
    base: Url,
}

impl RemoteStore {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| StoreError::Validation(format!("invalid base URL {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Validation(format!(
                "base URL {base_url:?} cannot carry a path"
            )));
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        id: Option<TaskId>,
    ) -> Result<T> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        debug!(url = %response.url(), %status, "api response");

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| StoreError::Corrupt(format!("unexpected response body: {e}")));
        }

        let message = error_body(response).await.error;
        Err(match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound(id),
            (StatusCode::BAD_REQUEST, _) => StoreError::Validation(message),
            _ => StoreError::Unavailable(format!("{status}: {message}")),
        })
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// The server's error payload, or the raw body as the message when it is not JSON.
async fn error_body(response: reqwest::Response) -> ErrorBody {
    let status = response.status();
    match response.text().await {
        Ok(text) => match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body,
            Err(_) if text.trim().is_empty() => ErrorBody::new(status.to_string()),
            Err(_) => ErrorBody::new(text),
        },
        Err(e) => ErrorBody::new(e.to_string()),
    }
}

#[async_trait]
impl TaskStore for RemoteStore {
    async fn list(&self) -> Result<Vec<Task>> {
        let request = self.http.get(self.endpoint(&["api", "tasks"]));
        self.call(request, None).await
    }

    async fn create(&self, fields: NewTask) -> Result<Task> {
        fields.validate()?;
        let request = self.http.post(self.endpoint(&["api", "tasks"])).json(&fields);
        self.call(request, None).await
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        patch.validate()?;
        let id_text = id.to_string();
        let request = self
            .http
            .put(self.endpoint(&["api", "tasks", &id_text]))
            .json(&patch);
        self.call(request, Some(id)).await
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        let id_text = id.to_string();
        let request = self.http.delete(self.endpoint(&["api", "tasks", &id_text]));
        let _: Value = self.call(request, Some(id)).await?;
        Ok(())
    }

    async fn complete(&self, id: TaskId, completed_at: DateTime<Local>) -> Result<CompletedTask> {
        let id_text = id.to_string();
        let body = CompleteTaskRequest {
            completed_at: Some(completed_at),
        };
        let request = self
            .http
            .post(self.endpoint(&["api", "tasks", &id_text, "complete"]))
            .json(&body);
        self.call(request, Some(id)).await
    }

    async fn completed(&self) -> Result<Vec<CompletedTask>> {
        let request = self.http.get(self.endpoint(&["api", "completed"]));
        self.call(request, None).await
    }
}

#[async_trait]
impl SettingsStore for RemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let url = self.endpoint(&["api", "settings", key]);
        let response = self.http.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            let setting: SettingValue = response
                .json()
                .await
                .map_err(|e| StoreError::Corrupt(format!("unexpected response body: {e}")))?;
            return Ok(Some(setting.value));
        }

        // Only the settings route's own 404 means unset; any other miss is a broken backend.
        let body = error_body(response).await;
        if status == StatusCode::NOT_FOUND && body.is_unset_setting() {
            return Ok(None);
        }
        Err(StoreError::Unavailable(format!("{status}: {}", body.error)))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let request = self
            .http
            .put(self.endpoint(&["api", "settings", key]))
            .json(&json!({ "value": value }));
        let _: SettingValue = self.call(request, None).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let request = self.http.delete(self.endpoint(&["api", "settings", key]));
        let _: Value = self.call(request, None).await?;
        Ok(())
    }
}
