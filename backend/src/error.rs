use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use shared::{ErrorBody, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("setting {0:?} not found")]
    SettingNotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::NotFound(_)) | ApiError::SettingNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(StoreError::Validation(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Corrupt(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        let body = match &self {
            ApiError::SettingNotFound(_) => {
                ErrorBody::new(self.to_string()).with_code(ErrorBody::SETTING_NOT_FOUND)
            }
            _ => ErrorBody::new(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
