use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use swarm_shared::api::{
    MessageCreatedResponse, MessageDeletedResponse, MessageListResponse, NewMessageRequest,
};

use crate::AppState;
use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::identity::Identity;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

pub async fn create_message(
    State(state): State<AppState>,
    AppJson(payload): AppJson<NewMessageRequest>,
) -> Result<Json<MessageCreatedResponse>, AppError> {
    let identity = Identity::from_env();

    let message = state
        .store
        .add_message(
            &payload.message,
            payload.author.as_deref(),
            &identity.hostname,
            &identity.container_id,
        )
        .await?;

    tracing::info!("Message {} stored by {}", message.id, identity.hostname);

    Ok(Json(MessageCreatedResponse {
        success: true,
        message_id: message.id,
        processed_by: identity.hostname,
        timestamp: Utc::now(),
        message,
    }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<MessageListResponse>, AppError> {
    let messages = state.store.list_messages(params.limit).await?;

    Ok(Json(MessageListResponse {
        messages,
        current_container: Identity::from_env().hostname,
        timestamp: Utc::now(),
    }))
}

pub async fn delete_message(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<MessageDeletedResponse>, AppError> {
    if !state.store.delete_message(id).await? {
        return Err(AppError::NotFound(format!("Message {} not found", id)));
    }

    let identity = Identity::from_env();
    tracing::info!("Message {} deleted by {}", id, identity.hostname);

    Ok(Json(MessageDeletedResponse {
        success: true,
        deleted_id: id,
        processed_by: identity.hostname,
        timestamp: Utc::now(),
    }))
}
