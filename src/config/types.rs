use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Feedrelay
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// Sweep scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between the start of two sweeps
    #[serde(rename = "sweep-interval", default = "default_sweep_interval")]
    pub sweep_interval: u64,

    /// Failed visits allowed per source within one sweep
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound for one fetch (seconds)
    #[serde(rename = "visit-timeout", default = "default_visit_timeout")]
    pub visit_timeout: u64,
}

impl SchedulerConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn visit_timeout(&self) -> Duration {
        Duration::from_secs(self.visit_timeout)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
            max_retries: default_max_retries(),
            visit_timeout: default_visit_timeout(),
        }
    }
}

/// Delivery loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Seconds between two delivery ticks
    #[serde(rename = "tick-interval", default = "default_tick_interval")]
    pub tick_interval: u64,
}

impl DeliveryConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub token: String,

    /// Channel used when a source names no channels of its own
    pub channel: String,

    #[serde(rename = "api-base", default = "default_api_base")]
    pub api_base: String,
}

/// One `[[source]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,

    #[serde(rename = "article-selector")]
    pub article_selector: String,

    #[serde(rename = "title-selector")]
    pub title_selector: String,

    #[serde(rename = "detail-selector")]
    pub detail_selector: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub channels: Vec<String>,
}

impl SourceEntry {
    /// The part of the entry that is persisted alongside the source row
    pub fn settings(&self) -> SourceSettings {
        SourceSettings {
            selectors: SelectorConfig {
                article: self.article_selector.clone(),
                title: self.title_selector.clone(),
                detail: self.detail_selector.clone(),
            },
            tags: self.tags.clone(),
            channels: self.channels.clone(),
        }
    }
}

/// CSS selectors locating article cards and their parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub article: String,
    pub title: String,
    pub detail: String,
}

/// Per-source settings stored as JSON in the `sources.config` column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
}

impl SourceSettings {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_max_retries() -> u32 {
    3
}

fn default_visit_timeout() -> u64 {
    10
}

fn default_tick_interval() -> u64 {
    3
}

fn default_user_agent() -> String {
    format!("feedrelay/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}
