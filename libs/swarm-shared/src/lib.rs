use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Records persisted by the board store. With the `sqlx` feature these derive
/// `FromRow` so the store can map query results directly.
pub mod models {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
    pub struct Message {
        pub id: i64,
        #[serde(rename = "message")]
        #[cfg_attr(feature = "sqlx", sqlx(rename = "message"))]
        pub text: String,
        pub author: String,
        pub hostname: String,
        pub container_id: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
    pub struct Visit {
        pub id: i64,
        pub hostname: String,
        pub container_id: String,
        pub timestamp: DateTime<Utc>,
        pub ip_address: Option<String>,
        pub user_agent: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
    pub struct ContainerStat {
        pub hostname: String,
        pub request_count: i64,
        pub last_seen: DateTime<Utc>,
    }

    /// Visit totals grouped by the host that served them.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
    pub struct HostVisits {
        pub hostname: String,
        pub container_id: String,
        pub visit_count: i64,
        pub last_visit: DateTime<Utc>,
    }

    /// A record owned by the remote item store. Only `id` and `name` are
    /// guaranteed; the rest depends on the upstream deployment.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Item {
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub created_at: Option<String>,
        #[serde(default)]
        pub updated_at: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ItemInput {
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
    }
}

pub mod api {
    use super::*;
    use super::models::{ContainerStat, HostVisits, Message};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LoadAverage {
        pub one: f64,
        pub five: f64,
        pub fifteen: f64,
    }

    /// Identity of the instance that answered, recomputed for every request.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ServerSnapshot {
        pub hostname: String,
        pub container_id: String,
        pub container_name: String,
        pub node_name: String,
        pub node_id: String,
        pub service_name: String,
        pub task_slot: String,
        pub platform: String,
        pub arch: String,
        pub environment: String,
        pub uptime_seconds: u64,
        pub load_average: LoadAverage,
        pub total_memory: u64,
        pub free_memory: u64,
        pub request_count: u64,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HealthResponse {
        pub status: String,
        pub timestamp: DateTime<Utc>,
        pub hostname: String,
        pub uptime: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatsResponse {
        pub total_visits: i64,
        pub visits_by_container: Vec<HostVisits>,
        pub recent_messages: Vec<Message>,
        pub container_stats: Vec<ContainerStat>,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NewMessageRequest {
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub author: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageCreatedResponse {
        pub success: bool,
        pub message_id: i64,
        pub processed_by: String,
        pub timestamp: DateTime<Utc>,
        pub message: Message,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageDeletedResponse {
        pub success: bool,
        pub deleted_id: i64,
        pub processed_by: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageListResponse {
        pub messages: Vec<Message>,
        pub current_container: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ClientConfigResponse {
        pub api_gateway_url: Option<String>,
        pub region: String,
        pub secrets_loaded: Vec<String>,
    }

    /// Body of every non-2xx answer from the board API.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorBody {
        pub error: String,
        pub message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub upstream_status: Option<u16>,
    }
}
