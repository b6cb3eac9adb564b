//! Error types for zarro

use thiserror::Error;

/// Result type alias using ZarroError
pub type Result<T> = std::result::Result<T, ZarroError>;

/// Main error type for zarro core operations
#[derive(Debug, Error)]
pub enum ZarroError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving environment variables
#[derive(Debug, Error)]
pub enum EnvError {
    /// A numeric variable holds something that is not a number
    #[error("Environment variable {name} should be numeric, but is '{value}'")]
    NotANumber { name: String, value: String },

    /// A variable a task cannot run without has no value
    #[error("Environment variable {name} is required{}", required_by_suffix(.task))]
    Missing { name: String, task: Option<String> },
}

fn required_by_suffix(task: &Option<String>) -> String {
    match task {
        Some(task) => format!(" by task '{}'", task),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_number_names_variable() {
        let err = EnvError::NotANumber {
            name: "MAX_CONCURRENCY".to_string(),
            value: "lots".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("MAX_CONCURRENCY"));
        assert!(message.contains("lots"));
    }

    #[test]
    fn test_missing_mentions_task() {
        let err = EnvError::Missing {
            name: "NUGET_API_KEY".to_string(),
            task: Some("push".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Environment variable NUGET_API_KEY is required by task 'push'"
        );

        let bare = EnvError::Missing {
            name: "GIT_TAG".to_string(),
            task: None,
        };
        assert_eq!(bare.to_string(), "Environment variable GIT_TAG is required");
    }
}
