use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use swarm_shared::api::{MessageListResponse, ServerSnapshot, StatsResponse};
use swarm_shared::models::Message;
use sysinfo::System;

/// Everything one tick saw. Never patched, only replaced.
#[derive(Debug)]
pub struct BoardView {
    pub hostname: String,
    pub platform: String,
    pub snapshot: Option<ServerSnapshot>,
    pub stats: Option<StatsResponse>,
    pub messages: Option<Vec<Message>>,
    pub error: Option<String>,
    pub fetched_at: DateTime<Local>,
}

impl BoardView {
    /// View built only from what this machine knows.
    pub fn local() -> Self {
        Self {
            hostname: local_hostname(),
            platform: "local".to_string(),
            snapshot: None,
            stats: None,
            messages: None,
            error: None,
            fetched_at: Local::now(),
        }
    }

    pub fn from_results(
        snapshot: Result<ServerSnapshot>,
        stats: Result<StatsResponse>,
        messages: Result<MessageListResponse>,
    ) -> Self {
        let mut errors = Vec::new();
        let snapshot = snapshot.map_err(|e| errors.push(format!("{:#}", e))).ok();
        let stats = stats.map_err(|e| errors.push(format!("{:#}", e))).ok();
        let messages = messages
            .map(|list| list.messages)
            .map_err(|e| errors.push(format!("{:#}", e)))
            .ok();

        let mut view = match &snapshot {
            Some(s) => Self {
                hostname: s.hostname.clone(),
                platform: s.platform.clone(),
                ..Self::local()
            },
            None => Self::local(),
        };

        view.snapshot = snapshot;
        view.stats = stats;
        view.messages = messages;
        if !errors.is_empty() {
            view.error = Some(errors.join("; "));
        }
        view
    }
}

fn local_hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}

pub struct Poller {
    client: Client,
    base_url: String,
    limit: usize,
    view: BoardView,
}

impl Poller {
    /// `timeout` bounds each request so a stalled replica cannot hold up
    /// later ticks.
    pub fn new(base_url: &str, limit: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
            view: BoardView::local(),
        })
    }

    pub fn view(&self) -> &BoardView {
        &self.view
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?
            .error_for_status()
            .with_context(|| format!("GET {} rejected", path))?
            .json()
            .await
            .with_context(|| format!("GET {} returned malformed JSON", path))
    }

    /// One poll: snapshot, stats and messages fetched together, view replaced.
    pub async fn tick(&mut self) -> &BoardView {
        let messages_path = format!("/api/messages?limit={}", self.limit);
        let (snapshot, stats, messages) = tokio::join!(
            self.fetch::<ServerSnapshot>("/api/server-info"),
            self.fetch::<StatsResponse>("/api/stats"),
            self.fetch::<MessageListResponse>(&messages_path),
        );

        self.view = BoardView::from_results(snapshot, stats, messages);
        if let Some(error) = &self.view.error {
            tracing::warn!("Poll of {} failed: {}", self.base_url, error);
        }
        &self.view
    }
}
