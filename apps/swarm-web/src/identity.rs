use chrono::Utc;
use std::time::Instant;
use swarm_shared::api::{LoadAverage, ServerSnapshot};
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tokio::sync::Mutex;

const UNKNOWN: &str = "unknown";
const SHORT_ID_LEN: usize = 12;

/// Environment-derived identity of this instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub hostname: String,
    pub container_id: String,
    pub container_name: String,
    pub node_name: String,
    pub node_id: String,
    pub service_name: String,
    pub task_slot: String,
    pub environment: String,
}

impl Identity {
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok(), System::host_name())
    }

    /// `host_name` is the OS view, used when `HOSTNAME` is not exported.
    pub fn resolve<F>(lookup: F, host_name: Option<String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_unknown = |key: &str| get(key).unwrap_or_else(|| UNKNOWN.to_string());

        let hostname = get("HOSTNAME")
            .or(host_name.filter(|h| !h.is_empty()))
            .unwrap_or_else(|| UNKNOWN.to_string());

        // Docker names containers after the first 12 hex digits of their id.
        let container_id = get("CONTAINER_ID").unwrap_or_else(|| {
            if hostname == UNKNOWN {
                UNKNOWN.to_string()
            } else {
                hostname.chars().take(SHORT_ID_LEN).collect()
            }
        });

        Self {
            container_name: or_unknown("CONTAINER_NAME"),
            node_name: or_unknown("NODE_NAME"),
            node_id: or_unknown("NODE_ID"),
            service_name: or_unknown("SERVICE_NAME"),
            task_slot: or_unknown("TASK_SLOT"),
            environment: get("NODE_ENV").unwrap_or_else(|| "development".to_string()),
            hostname,
            container_id,
        }
    }
}

pub struct IdentityProbe {
    started_at: Instant,
    system: Mutex<System>,
}

impl IdentityProbe {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            started_at: Instant::now(),
            system: Mutex::new(system),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub async fn snapshot(&self, request_count: u64) -> ServerSnapshot {
        self.snapshot_for(Identity::from_env(), request_count).await
    }

    pub async fn snapshot_for(&self, identity: Identity, request_count: u64) -> ServerSnapshot {
        let (total_memory, free_memory) = {
            let mut sys = self.system.lock().await;
            sys.refresh_memory();
            (sys.total_memory(), sys.free_memory())
        };
        let load = System::load_average();

        ServerSnapshot {
            hostname: identity.hostname,
            container_id: identity.container_id,
            container_name: identity.container_name,
            node_name: identity.node_name,
            node_id: identity.node_id,
            service_name: identity.service_name,
            task_slot: identity.task_slot,
            environment: identity.environment,
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            uptime_seconds: self.uptime_seconds(),
            load_average: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
            total_memory,
            free_memory,
            request_count,
            timestamp: Utc::now(),
        }
    }
}

impl Default for IdentityProbe {
    fn default() -> Self {
        Self::new()
    }
}
