use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::config::WebConfig;

const SECRETS_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

/// Base URL of the item API, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamUrl {
    Configured(String),
    NotConfigured,
}

impl UpstreamUrl {
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            UpstreamUrl::Configured(url) => Some(url),
            UpstreamUrl::NotConfigured => None,
        }
    }
}

/// Secrets resolved before the listener binds. Values never leave this type
/// except through `get`.
#[derive(Debug, Default)]
pub struct LoadedSecrets {
    values: HashMap<String, String>,
}

impl LoadedSecrets {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Everything the HTTP surface needs from the outside world, prepared once.
#[derive(Debug)]
pub struct Startup {
    pub upstream: UpstreamUrl,
    pub secrets: LoadedSecrets,
}

#[derive(Deserialize)]
struct ParameterEnvelope {
    #[serde(rename = "Parameter")]
    parameter: ParameterValue,
}

#[derive(Deserialize)]
struct ParameterValue {
    #[serde(rename = "Value")]
    value: String,
}

/// Reads parameters through the AWS Parameters and Secrets extension's local
/// HTTP endpoint.
#[derive(Clone)]
pub struct ParameterStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl ParameterStore {
    pub fn new(endpoint: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &WebConfig) -> Option<Self> {
        let endpoint = config.parameter_store_url.as_deref()?;
        Some(Self::new(endpoint, std::env::var("AWS_SESSION_TOKEN").ok()))
    }

    pub async fn get(&self, name: &str) -> Result<String> {
        let url = format!(
            "{}/systemsmanager/parameters/get?name={}&withDecryption=true",
            self.endpoint,
            urlencoding::encode(name)
        );

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header(SECRETS_TOKEN_HEADER, token);
        }

        let envelope: ParameterEnvelope = request
            .send()
            .await
            .with_context(|| format!("Parameter store unreachable for {}", name))?
            .error_for_status()
            .with_context(|| format!("Parameter store rejected {}", name))?
            .json()
            .await
            .with_context(|| format!("Malformed parameter store answer for {}", name))?;

        Ok(envelope.parameter.value)
    }
}

/// Runs the startup stage. An error here must stop the process before it
/// starts serving.
pub async fn prepare(config: &WebConfig) -> Result<Startup> {
    let store = ParameterStore::from_config(config);

    let secrets = load_secrets(config, store.as_ref()).await?;
    let upstream = resolve_upstream(config, &secrets, store.as_ref()).await;

    match &upstream {
        UpstreamUrl::Configured(url) => tracing::info!("Item API: {}", url),
        UpstreamUrl::NotConfigured => {
            tracing::warn!("Item API not configured; /api/items calls will fail")
        }
    }

    Ok(Startup { upstream, secrets })
}

pub async fn load_secrets(
    config: &WebConfig,
    store: Option<&ParameterStore>,
) -> Result<LoadedSecrets> {
    let mut values = HashMap::new();

    for name in &config.secret_parameters {
        let value = match read_secret_file(&config.secrets_dir, name).await {
            Some(value) => value,
            None => {
                let store = store.with_context(|| {
                    format!(
                        "Secret {} not found in {} and no parameter store is configured",
                        name,
                        config.secrets_dir.display()
                    )
                })?;
                store.get(name).await?
            }
        };

        tracing::info!("Secret loaded: {}", name);
        values.insert(name.clone(), value);
    }

    if !values.is_empty() {
        tracing::info!("All {} secrets loaded", values.len());
    }

    Ok(LoadedSecrets { values })
}

/// Environment first, then the secret stage, then the parameter store.
pub async fn resolve_upstream(
    config: &WebConfig,
    secrets: &LoadedSecrets,
    store: Option<&ParameterStore>,
) -> UpstreamUrl {
    if let Some(url) = &config.api_gateway_url {
        return UpstreamUrl::Configured(url.clone());
    }

    let Some(parameter) = config.api_url_parameter.as_deref() else {
        return UpstreamUrl::NotConfigured;
    };

    if let Some(url) = secrets.get(parameter) {
        return UpstreamUrl::Configured(url.to_string());
    }

    if let Some(store) = store {
        match store.get(parameter).await {
            Ok(url) if !url.trim().is_empty() => return UpstreamUrl::Configured(url.trim().to_string()),
            Ok(_) => tracing::warn!("Parameter {} is empty", parameter),
            Err(e) => tracing::warn!("Item API lookup failed: {:#}", e),
        }
    }

    UpstreamUrl::NotConfigured
}

/// Docker Swarm mounts secrets as files named after the secret, so only the
/// last path segment of a parameter name is used.
async fn read_secret_file(dir: &Path, name: &str) -> Option<String> {
    let file_name = name.rsplit('/').find(|s| !s.is_empty())?;
    let contents = tokio::fs::read_to_string(dir.join(file_name)).await.ok()?;
    Some(contents.trim().to_string())
}
