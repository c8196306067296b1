use sqlx::SqlitePool;
use swarm_shared::models::{ContainerStat, HostVisits, Message};

use crate::error::{Result, StoreError};
use crate::repositories::{message_repo::MessageRepository, visit_repo::VisitRepository};

pub const DEFAULT_AUTHOR: &str = "Anonymous";
pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MAX_AUTHOR_CHARS: usize = 30;
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 100;
pub const STATS_RECENT_MESSAGES: i64 = 10;

#[derive(Debug)]
pub struct BoardStats {
    pub total_visits: i64,
    pub visits_by_host: Vec<HostVisits>,
    pub recent_messages: Vec<Message>,
    pub container_stats: Vec<ContainerStat>,
}

/// The visit/message store of one instance. Counters are local to the file
/// behind `pool`; nothing is shared between containers.
#[derive(Clone, Debug)]
pub struct BoardStore {
    pool: SqlitePool,
    visits: VisitRepository,
    messages: MessageRepository,
}

impl BoardStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            visits: VisitRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn record_visit(
        &self,
        hostname: &str,
        container_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<()> {
        self.visits
            .record(hostname, container_id, ip_address, user_agent)
            .await
    }

    pub async fn add_message(
        &self,
        text: &str,
        author: Option<&str>,
        hostname: &str,
        container_id: &str,
    ) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("Message cannot be empty".into()));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(StoreError::Validation(format!(
                "Message cannot exceed {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let author = author.map(str::trim).filter(|a| !a.is_empty()).unwrap_or(DEFAULT_AUTHOR);
        if author.chars().count() > MAX_AUTHOR_CHARS {
            return Err(StoreError::Validation(format!(
                "Author cannot exceed {} characters",
                MAX_AUTHOR_CHARS
            )));
        }

        let msg = self.messages.create(text, author, hostname, container_id).await?;
        tracing::debug!("Stored message {} from {}", msg.id, msg.author);
        Ok(msg)
    }

    /// `None` means the default page size; anything else is clamped to
    /// `0..=MAX_LIST_LIMIT`.
    pub async fn list_messages(&self, limit: Option<i64>) -> Result<Vec<Message>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(0, MAX_LIST_LIMIT);
        self.messages.recent(limit).await
    }

    pub async fn delete_message(&self, id: i64) -> Result<bool> {
        self.messages.delete(id).await
    }

    pub async fn message_count(&self) -> Result<i64> {
        self.messages.count().await
    }

    pub async fn get_stats(&self) -> Result<BoardStats> {
        let (total_visits, visits_by_host, recent_messages, container_stats) = tokio::try_join!(
            self.visits.total(),
            self.visits.by_host(),
            self.messages.recent(STATS_RECENT_MESSAGES),
            self.visits.container_stats(),
        )?;

        Ok(BoardStats {
            total_visits,
            visits_by_host,
            recent_messages,
            container_stats,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
