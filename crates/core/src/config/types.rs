use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    5299
}

/// Outbound HTTP settings, applied uniformly to every provider call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    format!("shelfscout/{}", env!("CARGO_PKG_VERSION"))
}

/// Global search behaviour shared by every provider family.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    /// Age in days after which discovered capabilities are rediscovered.
    #[serde(default = "default_cache_age")]
    pub cache_age_days: u32,
    /// Cooldown applied to a failing provider. Zero disables blocking.
    #[serde(default = "default_blocklist_timer")]
    pub blocklist_timer_secs: u64,
    /// Drop indexer results older than this many days. Zero disables the filter.
    #[serde(default)]
    pub usenet_retention_days: u32,
    /// Choose magnet links over .torrent links when both are offered.
    #[serde(default)]
    pub prefer_magnet: bool,
    /// Author-name suffixes removed before searching ("jr", "phd", ...).
    #[serde(default = "default_name_postfix")]
    pub name_postfix: Vec<String>,
    /// Blocklist reasons longer than this are truncated.
    #[serde(default = "default_reason_max_len")]
    pub reason_max_len: usize,
    /// Size reported for results that don't advertise one.
    #[serde(default = "default_size")]
    pub default_size: u64,
    /// Date reported for results that don't advertise one.
    #[serde(default = "default_date")]
    pub default_date: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            cache_age_days: default_cache_age(),
            blocklist_timer_secs: default_blocklist_timer(),
            usenet_retention_days: 0,
            prefer_magnet: false,
            name_postfix: default_name_postfix(),
            reason_max_len: default_reason_max_len(),
            default_size: default_size(),
            default_date: default_date(),
        }
    }
}

fn default_cache_age() -> u32 {
    30
}

fn default_blocklist_timer() -> u64 {
    3600
}

fn default_name_postfix() -> Vec<String> {
    ["snr", "jnr", "jr", "sr", "phd"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_reason_max_len() -> usize {
    40
}

fn default_size() -> u64 {
    1000
}

fn default_date() -> String {
    "Fri, 01 Jan 1970 00:00:00 +0100".to_string()
}

/// Where the provider list is persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_providers_path")]
    pub providers_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            providers_path: default_providers_path(),
        }
    }
}

fn default_providers_path() -> PathBuf {
    PathBuf::from("providers.toml")
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub http: SanitizedHttpConfig,
    pub search: SearchSettings,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedHttpConfig {
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            http: SanitizedHttpConfig {
                timeout_secs: config.http.timeout_secs,
            },
            search: config.search.clone(),
            store: config.store.clone(),
        }
    }
}
