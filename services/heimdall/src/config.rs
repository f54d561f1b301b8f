//! Configuration types for the heimdall sync service

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            channel: ChannelConfig::default(),
            scheduler: SchedulerConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// HTTP API the site snapshots and messages are polled from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Push channel endpoint selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Host the channel connects to, e.g. `dash.example.com`
    #[serde(default = "default_channel_host")]
    pub host: String,
    /// Use the secure scheme (`wss`); off for local development
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_channel_path")]
    pub path: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: default_channel_host(),
            secure: false,
            path: default_channel_path(),
        }
    }
}

impl ChannelConfig {
    /// Full channel URL: secure origins use `wss` against the configured
    /// host, otherwise the insecure scheme against the development host.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.host, self.path)
    }
}

/// Action loop cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Countdown interval while the view layer reports focus
    #[serde(default = "default_focused_interval", with = "humantime_serde")]
    pub focused_interval: Duration,
    /// Slower interval while unfocused, to reduce background work
    #[serde(default = "default_unfocused_interval", with = "humantime_serde")]
    pub unfocused_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            focused_interval: default_focused_interval(),
            unfocused_interval: default_unfocused_interval(),
        }
    }
}

/// Read-only JSON mirror of the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:7000".to_string()
}

fn default_channel_host() -> String {
    "localhost:7000".to_string()
}

fn default_channel_path() -> String {
    "/api/sites/live/".to_string()
}

fn default_focused_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_unfocused_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    7100
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::HeimdallError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
