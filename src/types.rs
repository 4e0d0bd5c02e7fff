use std::fs;

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Environment variable consulted when `provider.api_key` is empty.
pub const API_KEY_ENV: &str = "SPORTS_DATA_API_KEY";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl ProviderConfig {
    /// API key from the file, else from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_tolerance")]
    pub odds_tolerance: f64,
    #[serde(default = "default_tolerance")]
    pub line_tolerance: f64,
    #[serde(default = "default_zero_line_epsilon")]
    pub zero_line_epsilon: f64,
    #[serde(default = "default_fallback_window_hours")]
    pub fallback_window_hours: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            odds_tolerance: default_tolerance(),
            line_tolerance: default_tolerance(),
            zero_line_epsilon: default_zero_line_epsilon(),
            fallback_window_hours: default_fallback_window_hours(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {path}"))?;
        let cfg: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to deserialize TOML config at {path}"))?;
        cfg.check()?;
        Ok(cfg)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.cache.backend == CacheBackend::Redis && self.redis.is_none() {
            anyhow::bail!("cache.backend = \"redis\" requires a [redis] section");
        }
        if self.validation.odds_tolerance <= 0.0 || self.validation.line_tolerance <= 0.0 {
            anyhow::bail!("validation tolerances must be positive");
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_cache_ttl_secs() -> u64 {
    15
}

fn default_tolerance() -> f64 {
    0.05
}

fn default_zero_line_epsilon() -> f64 {
    0.01
}

fn default_fallback_window_hours() -> i64 {
    crate::utils::time::FALLBACK_WINDOW_HOURS
}

fn default_batch_limit() -> i64 {
    500
}
