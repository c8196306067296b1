use axum::{Json, extract::State};
use serde_json::{Value, json};
use swarm_shared::models::{Item, ItemInput};

use crate::AppState;
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};

fn validate(input: &ItemInput) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Item name cannot be empty".into()));
    }
    Ok(())
}

pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.items.list_items().await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.items.get_item(&id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    AppJson(input): AppJson<ItemInput>,
) -> Result<Json<Item>, AppError> {
    validate(&input)?;
    Ok(Json(state.items.create_item(&input).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
    AppJson(input): AppJson<ItemInput>,
) -> Result<Json<Item>, AppError> {
    validate(&input)?;
    Ok(Json(state.items.update_item(&id, &input).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<Json<Value>, AppError> {
    state.items.delete_item(&id).await?;
    Ok(Json(json!({ "success": true, "deleted_id": id })))
}
