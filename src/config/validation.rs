use crate::config::types::{
    Config, DatabaseConfig, DeliveryConfig, SchedulerConfig, SourceEntry, TelegramConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scheduler_config(&config.scheduler)?;
    validate_delivery_config(&config.delivery)?;
    validate_database_config(&config.database)?;
    validate_telegram_config(&config.telegram)?;
    validate_sources(&config.sources)?;
    Ok(())
}

fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.sweep_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "sweep-interval must be >= 1s, got {}s",
            config.sweep_interval
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.visit_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "visit-timeout must be >= 1s, got {}s",
            config.visit_timeout
        )));
    }

    Ok(())
}

fn validate_delivery_config(config: &DeliveryConfig) -> Result<(), ConfigError> {
    if config.tick_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "tick-interval must be >= 1s, got {}s",
            config.tick_interval
        )));
    }
    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_telegram_config(config: &TelegramConfig) -> Result<(), ConfigError> {
    if config.token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram token cannot be empty".to_string(),
        ));
    }

    if config.channel.trim_start_matches('@').trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram channel cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base: {}", e)))?;

    Ok(())
}

fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in sources {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have a name",
                entry.url
            )));
        }

        let url = Url::parse(&entry.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid source URL '{}': {}", entry.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Source URL '{}' must use http or https",
                entry.url
            )));
        }

        if !seen.insert(entry.url.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Source URL '{}' is configured more than once",
                entry.url
            )));
        }

        for selector in [
            &entry.article_selector,
            &entry.title_selector,
            &entry.detail_selector,
        ] {
            validate_selector(selector)?;
        }
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(
            "Selector cannot be empty".to_string(),
        ));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
