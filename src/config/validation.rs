use crate::config::types::{
    Config, CrawlerConfig, DeleterConfig, OutputConfig, RemoteConfig, TargetConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound the remote batch API accepts per request
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_remote_config(&config.remote)?;
    validate_crawler_config(&config.crawler)?;
    validate_deleter_config(&config.deleter)?;
    validate_output_config(&config.output)?;
    validate_targets(&config.targets)?;
    Ok(())
}

/// Validates remote API configuration
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "api-base must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.token_env.is_empty() {
        return Err(ConfigError::Validation(
            "token-env cannot be empty".to_string(),
        ));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint-interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if !config.root_path.is_empty() && !config.root_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "root-path must be empty or start with '/', got '{}'",
            config.root_path
        )));
    }

    Ok(())
}

/// Validates batch delete configuration
fn validate_deleter_config(config: &DeleterConfig) -> Result<(), ConfigError> {
    if config.chunk_size < 1 || config.chunk_size > MAX_CHUNK_SIZE {
        return Err(ConfigError::Validation(format!(
            "chunk-size must be between 1 and {}, got {}",
            MAX_CHUNK_SIZE, config.chunk_size
        )));
    }

    if config.poll_interval < 1 {
        return Err(ConfigError::Validation(
            "poll-interval must be >= 1ms".to_string(),
        ));
    }

    if config.max_poll_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-poll-attempts must be >= 1, got {}",
            config.max_poll_attempts
        )));
    }

    if config.max_in_flight < 1 || config.max_in_flight > 16 {
        return Err(ConfigError::Validation(format!(
            "max-in-flight must be between 1 and 16, got {}",
            config.max_in_flight
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.plan_dir.is_empty() {
        return Err(ConfigError::Validation(
            "plan-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates deduplication targets
fn validate_targets(targets: &[TargetConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for target in targets {
        validate_target_name(&target.name)?;

        if !seen.insert(target.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate target name '{}'",
                target.name
            )));
        }

        for prefix in target
            .prefixes
            .iter()
            .chain(&target.prefer_under)
            .chain(&target.avoid_under)
        {
            if !prefix.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "Target '{}': prefix '{}' must start with '/'",
                    target.name, prefix
                )));
            }
        }
    }

    Ok(())
}

/// Target names end up in plan file names, so keep them simple
fn validate_target_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "Target name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Target name must contain only alphanumeric characters, '-' or '_', got '{}'",
            name
        )));
    }

    Ok(())
}
