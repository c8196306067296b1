use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default)]
    pub api_gateway_url: Option<String>,
    #[serde(default = "default_items_path")]
    pub items_path: String,
    #[serde(default = "default_aws_region")]
    pub aws_region: String,
    #[serde(default)]
    pub parameter_store_url: Option<String>,
    #[serde(default)]
    pub api_url_parameter: Option<String>,
    #[serde(default)]
    pub secret_parameters: Vec<String>,
    #[serde(default = "default_secrets_dir")]
    pub secrets_dir: PathBuf,
}

fn default_listen_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_database_url() -> String {
    "sqlite://data/swarm-board.db".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_items_path() -> String {
    "/api/items".to_string()
}

fn default_aws_region() -> String {
    "eu-west-1".to_string()
}

fn default_secrets_dir() -> PathBuf {
    PathBuf::from("/run/secrets")
}

impl WebConfig {
    pub fn load() -> Result<Self> {
        let config_paths = vec!["/etc/swarm-board/web.toml", "./web.toml"];

        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                tracing::info!("Loading config from {}", path);
                return Ok(toml::from_str(&contents)?);
            }
        }

        tracing::info!("Loading config from environment");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_port = match get("PORT") {
            Some(port) => port
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a number, got {:?}: {}", port, e))?,
            None => default_listen_port(),
        };

        Ok(Self {
            listen_port,
            environment: get("NODE_ENV").unwrap_or_else(default_environment),
            database_url: get("DATABASE_URL").unwrap_or_else(default_database_url),
            static_dir: get("STATIC_DIR").map(PathBuf::from).unwrap_or_else(default_static_dir),
            api_gateway_url: get("API_GATEWAY_URL"),
            items_path: get("ITEMS_PATH").unwrap_or_else(default_items_path),
            aws_region: get("AWS_REGION").unwrap_or_else(default_aws_region),
            parameter_store_url: get("PARAMETER_STORE_URL"),
            api_url_parameter: get("API_URL_PARAMETER"),
            secret_parameters: get("SECRET_PARAMETERS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            secrets_dir: get("SECRETS_DIR").map(PathBuf::from).unwrap_or_else(default_secrets_dir),
        })
    }
}
