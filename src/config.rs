use crate::cache::MAX_TTL_SECS;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.5993.117 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_basic_timeout")]
    pub basic_timeout_secs: u64,
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,
    #[serde(default = "default_basic_max_cost")]
    pub basic_max_cost: u32,
    #[serde(default = "default_render_max_cost")]
    pub render_max_cost: u32,
    #[serde(default = "default_render_retries")]
    pub render_retries: u32,
}

fn default_endpoint() -> String {
    "https://api.scraperapi.com".to_string()
}

fn default_basic_timeout() -> u64 {
    40
}

fn default_render_timeout() -> u64 {
    90
}

fn default_basic_max_cost() -> u32 {
    10
}

fn default_render_max_cost() -> u32 {
    20
}

fn default_render_retries() -> u32 {
    2
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            basic_timeout_secs: default_basic_timeout(),
            render_timeout_secs: default_render_timeout(),
            basic_max_cost: default_basic_max_cost(),
            render_max_cost: default_render_max_cost(),
            render_retries: default_render_retries(),
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self, render: bool) -> Duration {
        if render {
            Duration::from_secs(self.render_timeout_secs)
        } else {
            Duration::from_secs(self.basic_timeout_secs)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    86_400
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_validator_timeout")]
    pub timeout_secs: u64,
}

fn default_validator_timeout() -> u64 {
    15
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_validator_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_branches")]
    pub branches: usize,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

fn default_branches() -> usize {
    3
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            branches: default_branches(),
            user_agents: default_user_agents(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_secs(self.validator.timeout_secs)
    }

    /// Reject values the runtime cannot honour.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.ttl_secs > MAX_TTL_SECS {
            return Err(format!(
                "cache ttl {}s exceeds the maximum of {}s (use 0 for no expiry)",
                self.cache.ttl_secs, MAX_TTL_SECS
            ));
        }
        Ok(())
    }

    /// Environment wins over the file, so deployments can inject the credential.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("SCRAPERAPI_KEY").filter(|k| !k.trim().is_empty()) {
            self.scraper.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("SCRAPERAPI_ENDPOINT") {
            self.scraper.endpoint = endpoint;
        }
        if let Some(ttl) = lookup("CACHE_TTL_SECONDS").and_then(|v| v.parse().ok()) {
            self.cache.ttl_secs = ttl;
        }
        if let Some(bind) = lookup("BIND_ADDRESS") {
            self.server.bind_address = bind;
        }
    }
}

fn config_dir() -> PathBuf {
    // Shared with the vget CLI: ~/.config/vget/
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("vget")
}

fn config_path() -> PathBuf {
    config_dir().join("resolver.yml")
}

pub fn get_config() -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = load_config_from(&config_path())?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

pub fn load_config_from(path: &Path) -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub fn save_config_to(
    config: &Config,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}
