use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,

    #[serde(default)]
    pub evidence: EvidenceConfig,

    #[serde(default)]
    pub sweep: SweepConfig,

    #[serde(default)]
    pub web: WebConfig,
}

/// Hosted backend serving both the record API and object storage.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,

    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Deserialize)]
pub struct EvidenceConfig {
    /// Bound on each URL reachability probe; a timeout counts as unreachable.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            probe_timeout_seconds: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_interval")]
    pub check_interval_seconds: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_bucket() -> String {
    "imagenes".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_port() -> u16 {
    8080
}

/// Load configuration from config.toml and environment variables
pub fn load() -> Config {
    Figment::new()
        .merge(Toml::file("config.toml"))
        // Use double-underscore nesting for snake_case keys
        .merge(Env::prefixed("EQUIPLOAN_").split("__"))
        .extract()
        .expect("Failed to load configuration")
}

/// Validate configuration and return a user-friendly error
pub fn validate(config: &Config) -> Result<(), String> {
    let backend = &config.backend;

    if backend.url.is_none() {
        return Err("backend.url is required".into());
    }

    if backend.api_key.is_none() {
        return Err("backend.api_key is required".into());
    }

    if backend.bucket.is_empty() {
        return Err("backend.bucket must not be empty".into());
    }

    if config.evidence.probe_timeout_seconds == 0 {
        return Err("evidence.probe_timeout_seconds must be greater than 0".into());
    }

    if config.sweep.check_interval_seconds == 0 {
        return Err("sweep.check_interval_seconds must be greater than 0".into());
    }

    Ok(())
}

/// A sanitized view of BackendConfig safe for logging
#[derive(Debug)]
#[allow(dead_code)]
pub struct SanitizedBackendConfig {
    pub url: String,
    pub api_key: String,
    pub bucket: String,
}

impl BackendConfig {
    pub fn sanitized_for_log(&self) -> SanitizedBackendConfig {
        SanitizedBackendConfig {
            url: self.url.clone().unwrap_or_else(|| "<not set>".into()),
            api_key: if self.api_key.is_some() {
                "******".into()
            } else {
                "<not set>".into()
            },
            bucket: self.bucket.clone(),
        }
    }
}
