use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PINTEREST_BASE_URL: &str = "https://api.pinterest.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_QUEUE_DEPTH: usize = 1;

/// Top-level config (pinpost.toml + PINPOST_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinpostConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pinterest: PinterestConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Pinterest REST API settings used by the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinterestConfig {
    /// Base URL without trailing slash; `/v5/pins` is appended.
    #[serde(default = "default_pinterest_base_url")]
    pub base_url: String,
    /// Upper bound for one publish request, connect through body.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PinterestConfig {
    fn default() -> Self {
        Self {
            base_url: default_pinterest_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// When set, the sweep worker also triggers itself every N seconds.
    /// Unset means sweeps only run when `/api/run-scheduler` is called.
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// Number of triggers that may wait behind a running sweep.
    /// Further triggers are coalesced into the waiting one.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: None,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_pinterest_base_url() -> String {
    DEFAULT_PINTEREST_BASE_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pinpost/pinpost.db", home)
}

impl PinpostConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.pinpost/pinpost.toml
    ///
    /// A missing file yields the defaults. `PINPOST_SECTION__KEY` overrides
    /// any file value, and a bare `PORT` wins over `gateway.port`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: PinpostConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PINPOST_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "gateway.port".into()))
            .extract()
            .map_err(|e| crate::error::PinpostError::Config(e.to_string()))?;

        Ok(config)
    }

    /// `bind:port` string suitable for `SocketAddr` parsing.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.gateway.bind, self.gateway.port)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pinpost/pinpost.toml", home)
}
