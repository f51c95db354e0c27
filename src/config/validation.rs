use crate::config::types::{Config, CrawlerConfig, FetchConfig, StorageConfig};
use crate::ConfigError;
use crate::url::parse_absolute;

/// Upper bound on the worker pool size
const MAX_WORKERS: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_storage_config(&config.storage)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates worker pool configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.fetch_budget < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_budget must be >= 1, got {}",
            config.fetch_budget
        )));
    }

    if config.initial_seeds < 1 {
        return Err(ConfigError::Validation(format!(
            "initial_seeds must be >= 1, got {}",
            config.initial_seeds
        )));
    }

    if config.flush_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "flush_interval must be >= 1, got {}",
            config.flush_interval
        )));
    }

    Ok(())
}

/// Validates HTTP fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and timeout_secs ({}), got {}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates storage locations
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.frontier_path.is_empty() {
        return Err(ConfigError::Validation(
            "frontier_path cannot be empty".to_string(),
        ));
    }

    if config.pages_path.is_empty() {
        return Err(ConfigError::Validation(
            "pages_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates bootstrap seed URLs
///
/// A seed must satisfy the same rule as any URL the crawler fetches.
pub fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        parse_absolute(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;
    }

    Ok(())
}
