//! Task module files
//!
//! A task module is a TOML file holding any number of `[[task]]` and
//! `[[env]]` entries:
//!
//! ```toml
//! [[task]]
//! name = "docs"
//! help = "Build the documentation site"
//! depends_on = ["build"]
//! run = ["docfx docs/docfx.json"]
//! env = ["DOCS_OUTPUT"]
//!
//! [[env]]
//! name = "DOCS_OUTPUT"
//! default = "_site"
//! help = "Where the documentation is written"
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use zarro_core::EnvVarDescriptor;

use crate::discovery::DiscoveryError;
use crate::registry::TaskRegistrar;
use crate::task::{TaskAction, TaskDefinition};

/// Parsed contents of a task module file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskModule {
    /// Tasks defined by the module
    #[serde(default, rename = "task")]
    pub tasks: Vec<ModuleTask>,

    /// Variables declared by the module
    #[serde(default, rename = "env")]
    pub variables: Vec<EnvVarDescriptor>,
}

/// A `[[task]]` entry
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleTask {
    /// Task name
    pub name: String,
    /// Help text
    #[serde(default)]
    pub help: Option<String>,
    /// Tasks that must complete first
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Run dependencies concurrently instead of in order
    #[serde(default)]
    pub parallel: bool,
    /// Shell line(s) to run
    #[serde(default)]
    pub run: RunLines,
    /// Variables the task reads
    #[serde(default)]
    pub env: Vec<String>,
}

/// One shell line or a list of them
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum RunLines {
    /// No command; the task only runs its dependencies
    #[default]
    Nothing,
    /// A single line
    One(String),
    /// Several lines, run in order
    Many(Vec<String>),
}

impl RunLines {
    fn into_lines(self) -> Vec<String> {
        match self {
            Self::Nothing => Vec::new(),
            Self::One(line) => vec![line],
            Self::Many(lines) => lines,
        }
    }
}

fn task_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:-]*$").expect("task name pattern is valid")
    })
}

/// Check that a string can be used as a task name
pub fn is_valid_task_name(name: &str) -> bool {
    task_name_pattern().is_match(name)
}

impl TaskModule {
    /// Parse module source text
    pub fn parse(path: &Path, content: &str) -> Result<Self, DiscoveryError> {
        let module: Self = toml::from_str(content).map_err(|source| DiscoveryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        module.validate(path)?;
        Ok(module)
    }

    fn validate(&self, path: &Path) -> Result<(), DiscoveryError> {
        let invalid = |message: String| DiscoveryError::Invalid {
            path: path.to_path_buf(),
            message,
        };

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !is_valid_task_name(&task.name) {
                return Err(invalid(format!("'{}' is not a valid task name", task.name)));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(invalid(format!("task '{}' is defined twice", task.name)));
            }
            if let Some(dep) = task.depends_on.iter().find(|d| d.as_str() == task.name) {
                return Err(invalid(format!("task '{}' depends on itself", dep)));
            }
        }

        if let Some(variable) = self
            .variables
            .iter()
            .find(|v| v.name.is_empty() || v.name.contains('='))
        {
            return Err(invalid(format!(
                "'{}' is not a valid environment variable name",
                variable.name
            )));
        }
        Ok(())
    }

    /// Register the module's variables and tasks
    pub fn register(self, registrar: &mut TaskRegistrar<'_>) {
        for variable in self.variables {
            registrar.env().register(variable);
        }

        for task in self.tasks {
            if !task.env.is_empty() {
                registrar.associate(task.env.as_slice(), task.name.as_str());
            }

            let lines = task.run.into_lines();
            let mut definition = TaskDefinition::new(task.name).with_parallel(task.parallel);
            definition.help = task.help;
            definition.depends_on = task.depends_on;
            if !lines.is_empty() {
                definition.action = TaskAction::Shell(lines);
            }
            registrar.task(definition);
        }
    }
}

/// Read, parse and register a module file. Returns the number of tasks it
/// defined.
pub fn load_module(
    path: &Path,
    registrar: &mut TaskRegistrar<'_>,
) -> Result<usize, DiscoveryError> {
    debug!(path = %path.display(), "loading task module");
    let content = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let module = TaskModule::parse(path, &content)?;
    let count = module.tasks.len();
    module.register(registrar);
    Ok(count)
}
