//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::EnvironmentRegistry;
use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find a configuration file in `start_dir` or its parents. The first
/// match wins.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration, falling back to defaults when no file exists.
///
/// A file that exists but cannot be parsed is still an error.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
    }
}

/// Apply the `[env]` section as defaults on the registry
pub fn apply_env_defaults(config: &Config, registry: &EnvironmentRegistry) {
    for (name, value) in &config.env {
        debug!(name, "applying project default");
        registry.set_default(name, value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{EnvVarDescriptor, MapEnv};
    use tempfile::TempDir;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("zarro.toml");
        std::fs::write(&config_path, "[tasks]\nconcurrency = 2").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("zarro.toml");
        let yaml_path = temp.path().join("zarro.yaml");
        std::fs::write(&toml_path, "[tasks]\nconcurrency = 2").unwrap();
        std::fs::write(&yaml_path, "tasks:\n  concurrency: 3").unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, toml_path);
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(".zarro.toml");
        std::fs::write(&config_path, "").unwrap();
        let nested = temp.path().join("src").join("app");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("zarro.toml");
        std::fs::write(
            &config_path,
            "[env]\nBUILD_CONFIGURATION = \"Debug\"\n\n[discovery]\nimport_npm_scripts = false\n\n[tests]\npriority = [\"Slow\"]\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.env.get("BUILD_CONFIGURATION").unwrap(), "Debug");
        assert!(!config.discovery.import_npm_scripts);
        assert_eq!(config.discovery.local_tasks, "local-tasks");
        assert_eq!(config.tests.priority, vec!["Slow"]);
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("zarro.yaml");
        std::fs::write(
            &config_path,
            "tasks:\n  concurrency: 4\n  continue_on_error: true\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.tasks.concurrency, Some(4));
        assert!(config.tasks.continue_on_error);
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert!(config.discovery.import_npm_scripts);
    }

    #[test]
    fn test_load_config_or_default_rejects_broken_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("zarro.toml"), "[tasks\n").unwrap();
        assert!(load_config_or_default(temp.path()).is_err());
    }

    #[test]
    fn test_apply_env_defaults() {
        let registry =
            EnvironmentRegistry::with_source(MapEnv::new().with("PACK_TARGET_FOLDER", "out"));
        registry.register(EnvVarDescriptor::new("BUILD_CONFIGURATION").with_default("Release"));

        let mut config = Config::default();
        config.env.insert("BUILD_CONFIGURATION".to_string(), "Debug".to_string());
        config.env.insert("PACK_TARGET_FOLDER".to_string(), "dist".to_string());
        apply_env_defaults(&config, &registry);

        assert_eq!(registry.resolve("BUILD_CONFIGURATION").as_deref(), Some("Debug"));
        // the process environment still wins
        assert_eq!(registry.resolve("PACK_TARGET_FOLDER").as_deref(), Some("out"));
    }
}
