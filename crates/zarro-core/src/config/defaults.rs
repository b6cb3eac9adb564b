//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "zarro.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "zarro.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".zarro.toml",
        ".zarro.yaml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# zarro configuration

# Project defaults for environment variables. Values set in the process
# environment always win over these.
[env]
BUILD_CONFIGURATION = "Release"
PACK_TARGET_FOLDER = "packages"

[discovery]
local_tasks = "local-tasks"
override_tasks = "override-tasks"
external_tasks = "external-tasks"
import_npm_scripts = true

[tasks]
continue_on_error = false

[tests]
priority = []
"#;

/// Template for a new task module
pub fn task_module_template(name: &str) -> String {
    format!(
        r#"# Task module loaded from local-tasks/. Tasks defined here replace
# built-in tasks with the same name.

[[task]]
name = "{name}"
help = "Describe what {name} does"
depends_on = []
run = ["echo running {name}"]
env = []

# [[env]]
# name = "MY_SETTING"
# default = "value"
# help = "What MY_SETTING controls"
"#
    )
}
