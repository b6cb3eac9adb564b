//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_discovery(config)?;
    validate_tasks(config)?;
    validate_env(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_discovery(config: &Config) -> Result<()> {
    let dirs = [
        ("discovery.local_tasks", &config.discovery.local_tasks),
        ("discovery.override_tasks", &config.discovery.override_tasks),
        ("discovery.external_tasks", &config.discovery.external_tasks),
    ];

    for (field, value) in dirs {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "directory cannot be empty".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

fn validate_tasks(config: &Config) -> Result<()> {
    if config.tasks.concurrency == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "tasks.concurrency".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_env(config: &Config) -> Result<()> {
    if let Some(name) = config
        .env
        .keys()
        .find(|name| name.is_empty() || name.contains('='))
    {
        return Err(ConfigError::InvalidValue {
            field: format!("env.{}", name),
            message: "not a valid environment variable name".to_string(),
        }
        .into());
    }
    Ok(())
}
