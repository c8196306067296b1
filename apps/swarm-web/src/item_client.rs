use reqwest::{Client, Method, header};
use serde::{Deserialize, Serialize};
use swarm_shared::models::{Item, ItemInput};
use thiserror::Error;

use crate::startup::UpstreamUrl;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Item API is not configured: set API_GATEWAY_URL or API_URL_PARAMETER")]
    NotConfigured,

    #[error("Item API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Item API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Item API answered with an unreadable body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client for the externally owned item API. Holds no state besides the
/// resolved base URL; every call is one outbound request.
#[derive(Clone)]
pub struct ItemClient {
    client: Client,
    base_url: UpstreamUrl,
    items_path: String,
    user_agent: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemList {
    Bare(Vec<Item>),
    Wrapped { items: Vec<Item> },
}

impl ItemClient {
    pub fn new(base_url: UpstreamUrl, items_path: &str, hostname: &str) -> Self {
        let items_path = format!("/{}", items_path.trim_matches('/'));

        Self {
            client: Client::new(),
            base_url,
            items_path,
            user_agent: format!("swarm-web/{} ({})", env!("CARGO_PKG_VERSION"), hostname),
        }
    }

    #[cfg(test)]
    pub fn is_configured(&self) -> bool {
        matches!(self.base_url, UpstreamUrl::Configured(_))
    }

    pub async fn call_api<B>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ProxyError>
    where
        B: Serialize + ?Sized,
    {
        let UpstreamUrl::Configured(base_url) = &self.base_url else {
            return Err(ProxyError::NotConfigured);
        };

        let url = format!("{}{}", base_url.trim_end_matches('/'), endpoint);
        tracing::debug!("Item API {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, &self.user_agent);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    fn item_endpoint(&self, id: &str) -> String {
        format!("{}/{}", self.items_path, urlencoding::encode(id))
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, ProxyError> {
        let response = self
            .call_api::<()>(&self.items_path, Method::GET, None)
            .await?;

        Ok(match response.json::<ItemList>().await.map_err(ProxyError::Decode)? {
            ItemList::Bare(items) | ItemList::Wrapped { items } => items,
        })
    }

    pub async fn get_item(&self, id: &str) -> Result<Item, ProxyError> {
        let response = self
            .call_api::<()>(&self.item_endpoint(id), Method::GET, None)
            .await?;
        response.json().await.map_err(ProxyError::Decode)
    }

    pub async fn create_item(&self, input: &ItemInput) -> Result<Item, ProxyError> {
        let response = self
            .call_api(&self.items_path, Method::POST, Some(input))
            .await?;
        response.json().await.map_err(ProxyError::Decode)
    }

    pub async fn update_item(&self, id: &str, input: &ItemInput) -> Result<Item, ProxyError> {
        let response = self
            .call_api(&self.item_endpoint(id), Method::PUT, Some(input))
            .await?;
        response.json().await.map_err(ProxyError::Decode)
    }

    pub async fn delete_item(&self, id: &str) -> Result<(), ProxyError> {
        self.call_api::<()>(&self.item_endpoint(id), Method::DELETE, None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::json;

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route(
                "/api/items",
                get(|| async {
                    Json(json!({ "items": [{ "id": "1", "name": "Lamp" }] }))
                })
                .post(|headers: HeaderMap, Json(input): Json<serde_json::Value>| async move {
                    let agent = headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({ "id": "2", "name": input["name"], "description": agent }))
                }),
            )
            .route(
                "/api/items/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        Err((StatusCode::NOT_FOUND, "no such item"))
                    } else {
                        Ok(Json(json!({ "id": id, "name": "Lamp" })))
                    }
                })
                .delete(|| async { StatusCode::NO_CONTENT })
                .put(|| async { "<html>maintenance</html>" }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn unconfigured_client_fails_fast() {
        let client = ItemClient::new(UpstreamUrl::NotConfigured, "/api/items", "web-1");
        assert!(!client.is_configured());

        let err = client.list_items().await.unwrap_err();
        assert!(matches!(err, ProxyError::NotConfigured));
    }

    #[tokio::test]
    async fn lists_wrapped_item_payloads() {
        let base = spawn_upstream().await;
        let client = ItemClient::new(UpstreamUrl::Configured(base), "api/items/", "web-1");

        let items = client.list_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Lamp");
    }

    #[tokio::test]
    async fn create_sends_json_and_identifies_host() {
        let base = spawn_upstream().await;
        let client = ItemClient::new(UpstreamUrl::Configured(base), "/api/items", "web-7");

        let item = client
            .create_item(&ItemInput {
                name: "Desk".to_string(),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(item.name, "Desk");
        assert!(item.description.unwrap().contains("web-7"));
    }

    #[tokio::test]
    async fn non_success_status_carries_upstream_text() {
        let base = spawn_upstream().await;
        let client = ItemClient::new(UpstreamUrl::Configured(base), "/api/items", "web-1");

        match client.get_item("missing").await.unwrap_err() {
            ProxyError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such item");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreadable_success_body_is_a_decode_error() {
        let base = spawn_upstream().await;
        let client = ItemClient::new(UpstreamUrl::Configured(base), "/api/items", "web-1");

        let input = ItemInput {
            name: "Desk".to_string(),
            description: None,
        };
        let err = client.update_item("1", &input).await.unwrap_err();
        assert!(matches!(err, ProxyError::Decode(_)));
    }

    #[tokio::test]
    async fn delete_accepts_no_content() {
        let base = spawn_upstream().await;
        let client = ItemClient::new(UpstreamUrl::Configured(base), "/api/items", "web-1");

        client.delete_item("1").await.unwrap();
    }
}
