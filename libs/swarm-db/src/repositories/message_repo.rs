use chrono::Utc;
use sqlx::SqlitePool;
use swarm_shared::models::Message;

use crate::error::Result;

#[derive(Clone, Debug)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        text: &str,
        author: &str,
        hostname: &str,
        container_id: &str,
    ) -> Result<Message> {
        let rec = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (message, author, hostname, container_id, timestamp)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, message, author, hostname, container_id, timestamp
            "#,
        )
        .bind(text)
        .bind(author)
        .bind(hostname)
        .bind(container_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(rec)
    }

    /// Newest first. Ties on timestamp fall back to insertion order.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Message>> {
        let recs = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, message, author, hostname, container_id, timestamp
            FROM messages
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(recs)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
