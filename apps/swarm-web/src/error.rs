use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use swarm_db::StoreError;
use swarm_shared::api::ErrorBody;
use thiserror::Error;

use crate::item_client::ProxyError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, kind, upstream_status) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error", None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None),
            AppError::Proxy(ProxyError::NotConfigured) => {
                (StatusCode::SERVICE_UNAVAILABLE, "not_configured", None)
            }
            AppError::Proxy(ProxyError::Status { status, .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error", Some(*status))
            }
            AppError::Proxy(ProxyError::Transport(_)) => {
                (StatusCode::BAD_GATEWAY, "upstream_unreachable", None)
            }
            AppError::Proxy(ProxyError::Decode(_)) => {
                (StatusCode::BAD_GATEWAY, "upstream_error", None)
            }
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", kind, message);
        }

        let body = ErrorBody {
            error: kind.to_string(),
            message,
            upstream_status,
        };
        (status, Json(body)).into_response()
    }
}
