use axum::{Json, extract::State};
use chrono::Utc;
use swarm_shared::api::StatsResponse;

use crate::AppState;
use crate::error::AppError;

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.store.get_stats().await?;

    Ok(Json(StatsResponse {
        total_visits: stats.total_visits,
        visits_by_container: stats.visits_by_host,
        recent_messages: stats.recent_messages,
        container_stats: stats.container_stats,
        timestamp: Utc::now(),
    }))
}
