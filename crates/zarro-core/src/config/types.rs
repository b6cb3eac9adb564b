//! Configuration types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Project-level defaults for environment variables. These replace the
    /// built-in defaults but never win over the process environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Task discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Task execution settings
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Test ordering settings
    #[serde(default)]
    pub tests: TestsConfig,
}

/// Where task modules are discovered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directory of project task modules
    pub local_tasks: String,

    /// Directory of highest-precedence task modules
    pub override_tasks: String,

    /// Directory whose subdirectories each hold task modules
    pub external_tasks: String,

    /// Import package.json scripts as tasks
    pub import_npm_scripts: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            local_tasks: "local-tasks".to_string(),
            override_tasks: "override-tasks".to_string(),
            external_tasks: "external-tasks".to_string(),
            import_npm_scripts: true,
        }
    }
}

/// Task execution configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Maximum concurrent tasks, when MAX_CONCURRENCY is not set
    pub concurrency: Option<usize>,

    /// Keep running independent tasks after one fails
    pub continue_on_error: bool,
}

/// Test sequencing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsConfig {
    /// Test base names that always run first
    pub priority: Vec<String>,
}
