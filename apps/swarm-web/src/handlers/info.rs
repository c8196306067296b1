use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::atomic::Ordering;
use swarm_shared::api::{ClientConfigResponse, HealthResponse, ServerSnapshot};

use crate::AppState;
use crate::identity::Identity;

pub async fn server_info(State(state): State<AppState>) -> Json<ServerSnapshot> {
    let requests = state.metrics.requests_served.load(Ordering::Relaxed);
    Json(state.probe.snapshot(requests).await)
}

/// Liveness only; never touches the store.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        hostname: Identity::from_env().hostname,
        uptime: state.probe.uptime_seconds(),
    })
}

pub async fn client_config(State(state): State<AppState>) -> Json<ClientConfigResponse> {
    Json(ClientConfigResponse {
        api_gateway_url: state.upstream.as_deref().map(String::from),
        region: state.config.aws_region.clone(),
        secrets_loaded: state.secret_names.as_ref().clone(),
    })
}

/// Script that exposes the serving container to the page before the app loads.
pub async fn hostname_js() -> impl IntoResponse {
    let identity = Identity::from_env();
    let quote = |value: &str| serde_json::to_string(value).unwrap_or_else(|_| "\"unknown\"".to_string());

    let script = format!(
        "window.CONTAINER_HOSTNAME = {};\nwindow.CONTAINER_ID = {};\n",
        quote(&identity.hostname),
        quote(&identity.container_id),
    );

    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        script,
    )
}
