use chrono::Utc;
use sqlx::SqlitePool;
use swarm_shared::models::{ContainerStat, HostVisits};

use crate::error::Result;

#[derive(Clone, Debug)]
pub struct VisitRepository {
    pool: SqlitePool,
}

impl VisitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends a visit and bumps the per-host counter in one transaction.
    pub async fn record(
        &self,
        hostname: &str,
        container_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO visits (hostname, container_id, timestamp, ip_address, user_agent)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(hostname)
        .bind(container_id)
        .bind(now)
        .bind(ip_address)
        .bind(user_agent)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO container_stats (hostname, request_count, last_seen)
            VALUES (?, 1, ?)
            ON CONFLICT(hostname) DO UPDATE SET
                request_count = request_count + 1,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(hostname)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn total(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn by_host(&self) -> Result<Vec<HostVisits>> {
        let recs = sqlx::query_as::<_, HostVisits>(
            r#"
            SELECT hostname,
                   MAX(container_id) AS container_id,
                   COUNT(*) AS visit_count,
                   MAX(timestamp) AS last_visit
            FROM visits
            GROUP BY hostname
            ORDER BY visit_count DESC, hostname
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(recs)
    }

    pub async fn container_stats(&self) -> Result<Vec<ContainerStat>> {
        let recs = sqlx::query_as::<_, ContainerStat>(
            r#"
            SELECT hostname, request_count, last_seen
            FROM container_stats
            ORDER BY request_count DESC, hostname
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(recs)
    }

    #[cfg(test)]
    pub async fn container_stat(&self, hostname: &str) -> Result<Option<ContainerStat>> {
        let rec = sqlx::query_as::<_, ContainerStat>(
            "SELECT hostname, request_count, last_seen FROM container_stats WHERE hostname = ?",
        )
        .bind(hostname)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }
}
