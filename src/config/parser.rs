use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup so operators can tell which source list a
/// running relay was started with.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID: &str = r##"
[scheduler]
sweep-interval = 900
max-retries = 5
visit-timeout = 20

[delivery]
tick-interval = 2

[database]
path = "./relay.db"

[telegram]
token = "123:abc"
channel = "news"

[[source]]
name = "research!rsc"
url = "https://research.swtch.com/"
article-selector = "ul.toc li"
title-selector = "a"
detail-selector = "a"
tags = ["go", "#research"]

[[source]]
name = "Example"
url = "https://example.com/blog"
article-selector = "article"
title-selector = "h2"
detail-selector = "a.more"
channels = ["first", "second"]
"##;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scheduler.sweep_interval, 900);
        assert_eq!(config.scheduler.max_retries, 5);
        assert_eq!(config.scheduler.visit_timeout, 20);
        assert_eq!(config.delivery.tick_interval, 2);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].tags, vec!["go", "#research"]);
        assert!(config.sources[0].channels.is_empty());
        assert_eq!(config.sources[1].channels, vec!["first", "second"]);
    }

    #[test]
    fn test_defaults_apply_when_sections_missing() {
        let config = parse_config(
            r#"
[database]
path = "./relay.db"

[telegram]
token = "123:abc"
channel = "news"
"#,
        )
        .unwrap();

        assert_eq!(config.scheduler.sweep_interval, 3600);
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.scheduler.visit_timeout, 10);
        assert_eq!(config.delivery.tick_interval, 3);
        assert!(config.fetcher.user_agent.starts_with("feedrelay/"));
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/feedrelay.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID.replace("max-retries = 5", "max-retries = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_settings_survive_json() {
        let config = parse_config(VALID).unwrap();
        let settings = config.sources[1].settings();
        let json = settings.to_json().unwrap();
        let decoded = crate::config::SourceSettings::from_json(&json).unwrap();
        assert_eq!(decoded, settings);
        assert_eq!(decoded.selectors.detail, "a.more");
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
