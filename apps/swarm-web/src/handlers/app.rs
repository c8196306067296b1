use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::Response,
};
use std::path::{Component, Path, PathBuf};

use crate::AppState;

const INDEX_FILE: &str = "index.html";

fn build_asset_response(bytes: Vec<u8>, mime: &str, cache_control: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CACHE_CONTROL, cache_control)
        .body(Body::from(bytes))
        .unwrap_or_else(|_| not_found())
}

fn not_found() -> Response {
    let mut response = Response::new(Body::from("Not Found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Joins `path` under `root`, refusing anything that climbs out of it.
fn resolve(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

async fn read_asset(root: &Path, path: &str) -> Option<Response> {
    let full_path = resolve(root, path)?;
    if !full_path.is_file() {
        return None;
    }

    let bytes = tokio::fs::read(&full_path).await.ok()?;
    let mime = mime_guess::from_path(&full_path).first_or_octet_stream();
    let cache_control = if path == INDEX_FILE {
        "no-cache"
    } else {
        "public, max-age=3600"
    };
    Some(build_asset_response(bytes, mime.as_ref(), cache_control))
}

/// Static assets from the built frontend, then the SPA entry document for
/// every other path.
pub async fn serve_spa(State(state): State<AppState>, uri: Uri) -> Response {
    let root = state.config.static_dir.as_path();
    let path = uri.path().trim_start_matches('/');

    if !path.is_empty() {
        if let Some(response) = read_asset(root, path).await {
            return response;
        }
    }

    read_asset(root, INDEX_FILE).await.unwrap_or_else(not_found)
}
