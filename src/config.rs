// src/config.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::MAX_LOOKUP_BATCH;
use crate::cache::TtlPolicy;
use crate::provider::vapi::DEFAULT_BASE_URL;

pub const ENV_CONFIG_PATH: &str = "CALL_ANALYTICS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/analytics.toml";
const ENV_API_KEY: &str = "VAPI_API_KEY";
/// Upper bound for `analytics.max_days` (ten years).
pub const MAX_RANGE_DAYS: u32 = 3650;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub analytics: AnalyticsConfig,
    pub cache: CacheConfig,
    /// Dashboard user id -> owner (assistant) id.
    pub tenants: HashMap<String, String>,
    pub analysis_store: AnalysisStoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// "ENV" means: read from `VAPI_API_KEY`.
    pub api_key: String,
    /// Calls requested per fetch.
    pub fetch_limit: usize,
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: "ENV".to_string(),
            fetch_limit: 1000,
            timeout_ms: 10_000,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub default_days: u32,
    pub max_days: u32,
    pub default_limit: usize,
    pub lookup_batch_size: usize,
    pub lookup_concurrency: usize,
    /// Offset for hour/day buckets, in minutes east of UTC.
    pub utc_offset_minutes: i32,
    pub estimate_when_unavailable: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_days: 30,
            max_days: 365,
            default_limit: 50,
            lookup_batch_size: MAX_LOOKUP_BATCH,
            lookup_concurrency: 4,
            utc_offset_minutes: 0,
            estimate_when_unavailable: true,
        }
    }
}

impl AnalyticsConfig {
    /// Falls back to UTC when the configured offset is out of range.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_capacity: u64,
    pub ttl: TtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 1_000,
            ttl: TtlPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisStoreConfig {
    /// JSON export of analysis rows. No store when unset.
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from an explicit TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config in {}", path.display()))?;
        cfg.finish()
    }

    /// Load using env var + fallbacks:
    /// 1) $CALL_ANALYTICS_CONFIG
    /// 2) config/analytics.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        AppConfig::default().finish()
    }

    /// Resolve secrets and pull values back into their valid ranges.
    fn finish(mut self) -> Result<Self> {
        if self.provider.api_key.trim().eq_ignore_ascii_case("env") {
            self.provider.api_key = std::env::var(ENV_API_KEY).unwrap_or_default();
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(anyhow!("provider.base_url must not be empty"));
        }

        let a = &mut self.analytics;
        a.lookup_batch_size = a.lookup_batch_size.clamp(1, MAX_LOOKUP_BATCH);
        a.lookup_concurrency = a.lookup_concurrency.max(1);
        a.max_days = a.max_days.clamp(1, MAX_RANGE_DAYS);
        a.default_days = a.default_days.clamp(1, a.max_days);

        self.provider.fetch_limit = self.provider.fetch_limit.max(1);
        self.provider.timeout_ms = self.provider.timeout_ms.max(1);
        self.cache.ttl.tiers.sort_by_key(|t| t.max_days);
        Ok(self)
    }
}
