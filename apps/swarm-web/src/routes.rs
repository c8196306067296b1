use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get},
};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;
use crate::handlers;
use crate::identity::Identity;

pub fn router(state: AppState) -> Router {
    // Board routes count as visits; health, config and item proxy do not.
    let board = Router::new()
        .route("/api/server-info", get(handlers::info::server_info))
        .route("/api/stats", get(handlers::stats::get_stats))
        .route(
            "/api/messages",
            get(handlers::messages::list_messages).post(handlers::messages::create_message),
        )
        .route("/api/messages/{id}", delete(handlers::messages::delete_message))
        .route_layer(middleware::from_fn_with_state(state.clone(), visit_middleware));

    Router::new()
        .merge(board)
        .route("/api/health", get(handlers::info::health))
        .route("/api/config", get(handlers::info::client_config))
        .route(
            "/api/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route(
            "/api/items/{id}",
            get(handlers::items::get_item)
                .put(handlers::items::update_item)
                .delete(handlers::items::delete_item),
        )
        .route("/hostname.js", get(handlers::info::hostname_js))
        .fallback(handlers::app::serve_spa)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Records the visit in the background so the response never waits on, or
/// fails because of, the store.
async fn visit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.metrics.requests_served.fetch_add(1, Ordering::Relaxed);

    let identity = Identity::from_env();
    let ip_address = client_ip(&req);
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let store = state.store.clone();
    tokio::spawn(async move {
        if let Err(e) = store
            .record_visit(
                &identity.hostname,
                &identity.container_id,
                ip_address.as_deref(),
                user_agent.as_deref(),
            )
            .await
        {
            tracing::warn!("Failed to record visit: {}", e);
        }
    });

    next.run(req).await
}

/// Swarm's ingress mesh rewrites the peer address, so a forwarded header wins.
fn client_ip(req: &Request) -> Option<String> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebConfig;
    use crate::startup::{LoadedSecrets, Startup, UpstreamUrl};
    use axum::{
        body::{Body, to_bytes},
        http::{Method, StatusCode},
    };
    use serde_json::{Value, json};
    use std::time::Duration;
    use swarm_db::BoardStore;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let pool = swarm_db::db::init_memory_db().await.unwrap();
        let config = WebConfig::from_lookup(|_| None).unwrap();
        AppState::new(
            config,
            BoardStore::new(pool),
            Startup {
                upstream: UpstreamUrl::NotConfigured,
                secrets: LoadedSecrets::default(),
            },
        )
    }

    async fn send(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = axum::http::Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_always_healthy() {
        let state = test_state().await;

        let response = send(&state, Method::GET, "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(!body["hostname"].as_str().unwrap().is_empty());

        state.store.close().await;
        let response = send(&state, Method::GET, "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn posted_message_is_listed_first() {
        let state = test_state().await;

        let response = send(
            &state,
            Method::POST,
            "/api/messages",
            Some(json!({ "message": "hello", "author": "Alice" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["success"], true);
        assert!(created["message_id"].is_i64());
        assert!(!created["processed_by"].as_str().unwrap().is_empty());

        let response = send(&state, Method::GET, "/api/messages?limit=1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        let messages = listed["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["id"], created["message_id"]);
        assert_eq!(messages[0]["message"], "hello");
        assert_eq!(messages[0]["author"], "Alice");
        assert!(listed["current_container"].is_string());
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let state = test_state().await;

        for payload in [json!({ "message": "" }), json!({ "message": "   " }), json!({})] {
            let response = send(&state, Method::POST, "/api/messages", Some(payload)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["error"], "validation_error");
            assert!(body["message"].is_string());
        }

        assert_eq!(state.store.message_count().await.unwrap(), 0);
    }

    async fn assert_validation_json(response: Response) {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_requests_answer_json_bad_request() {
        let state = test_state().await;

        let response = send(&state, Method::GET, "/api/messages?limit=abc", None).await;
        assert_validation_json(response).await;

        let response = send(&state, Method::DELETE, "/api/messages/abc", None).await;
        assert_validation_json(response).await;

        let response = send(
            &state,
            Method::POST,
            "/api/messages",
            Some(json!({ "message": null })),
        )
        .await;
        assert_validation_json(response).await;

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/messages")
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_validation_json(response).await;

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/items")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_validation_json(response).await;

        assert_eq!(state.store.message_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unreadable_upstream_body_is_bad_gateway() {
        let upstream = Router::new().route("/api/items", get(|| async { "<html>oops</html>" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let pool = swarm_db::db::init_memory_db().await.unwrap();
        let config = WebConfig::from_lookup(|_| None).unwrap();
        let state = AppState::new(
            config,
            BoardStore::new(pool),
            Startup {
                upstream: UpstreamUrl::Configured(format!("http://{}", addr)),
                secrets: LoadedSecrets::default(),
            },
        );

        let response = send(&state, Method::GET, "/api/items", None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"], "upstream_error");
    }

    #[tokio::test]
    async fn deleting_unknown_message_is_not_found() {
        let state = test_state().await;

        let response = send(&state, Method::DELETE, "/api/messages/999999", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "not_found");
    }

    #[tokio::test]
    async fn deleting_existing_message_succeeds_once() {
        let state = test_state().await;
        let msg = state.store.add_message("bye", None, "web-1", "web-1").await.unwrap();
        let uri = format!("/api/messages/{}", msg.id);

        let response = send(&state, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["deleted_id"], msg.id);

        let response = send(&state, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_fail_with_json_when_store_is_gone() {
        let state = test_state().await;
        state.store.close().await;

        let response = send(&state, Method::GET, "/api/stats", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "store_error");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn instrumented_requests_are_recorded() {
        let state = test_state().await;

        let response = send(&state, Method::GET, "/api/server-info", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let snapshot = body_json(response).await;
        assert_eq!(snapshot["requestCount"], 1);
        assert!(snapshot["containerId"].is_string());

        let mut total = 0;
        for _ in 0..50 {
            let stats = state.store.get_stats().await.unwrap();
            total = stats.total_visits;
            if total > 0 {
                assert_eq!(stats.container_stats.len(), 1);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(total, 1);

        let response = send(&state, Method::GET, "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.metrics.requests_served.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn stats_shape_matches_board_client() {
        let state = test_state().await;
        state.store.record_visit("web-1", "web-1", None, None).await.unwrap();
        state.store.add_message("hi", None, "web-1", "web-1").await.unwrap();

        let response = send(&state, Method::GET, "/api/stats", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["total_visits"].as_i64().unwrap() >= 1);
        assert!(body["visits_by_container"].is_array());
        assert_eq!(body["recent_messages"][0]["message"], "hi");
        assert_eq!(body["container_stats"][0]["hostname"], "web-1");
    }

    #[tokio::test]
    async fn hostname_script_is_javascript() {
        let state = test_state().await;

        let response = send(&state, Method::GET, "/hostname.js", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/javascript"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let script = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(script.starts_with("window.CONTAINER_HOSTNAME = \""));
    }

    #[tokio::test]
    async fn items_without_upstream_fail_fast() {
        let state = test_state().await;

        let response = send(&state, Method::GET, "/api/items", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"], "not_configured");

        let response = send(&state, Method::GET, "/api/config", None).await;
        let body = body_json(response).await;
        assert!(body["apiGatewayUrl"].is_null());
        assert_eq!(body["region"], "eu-west-1");
    }

    #[tokio::test]
    async fn item_names_are_validated_before_forwarding() {
        let state = test_state().await;

        let response = send(&state, Method::POST, "/api/items", Some(json!({ "name": " " }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_paths_get_the_app_shell() {
        let dir = std::env::temp_dir().join(format!("swarm-web-dist-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("assets")).unwrap();
        std::fs::write(dir.join("index.html"), "<html>board</html>").unwrap();
        std::fs::write(dir.join("assets").join("app.js"), "console.log(1)").unwrap();

        let mut state = test_state().await;
        state.config.static_dir = dir.clone();

        let response = send(&state, Method::GET, "/some/client/route", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<html>board</html>");

        let response = send(&state, Method::GET, "/assets/app.js", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .contains("javascript")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn forwarded_address_wins_over_peer() {
        let mut req = axum::http::Request::builder()
            .uri("/api/stats")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 5000))));
        assert_eq!(client_ip(&req).as_deref(), Some("203.0.113.7"));

        req.headers_mut().remove("x-forwarded-for");
        assert_eq!(client_ip(&req).as_deref(), Some("10.0.0.2"));
    }
}
