//! Variable declarations, resolution and task associations

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::EnvError;

use super::source::{EnvSource, ProcessEnv};

/// A variable known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name
    pub name: String,
    /// Value used when the environment does not provide one
    pub default: Option<String>,
    /// Human-readable description
    pub help: Option<String>,
    /// Tasks that read this variable
    pub tasks: BTreeSet<String>,
}

impl EnvironmentVariable {
    fn undeclared(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            help: None,
            tasks: BTreeSet::new(),
        }
    }
}

/// Declaration of a variable's default and help text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarDescriptor {
    /// Variable name
    pub name: String,
    /// Default value
    #[serde(default)]
    pub default: Option<String>,
    /// Help text
    #[serde(default)]
    pub help: Option<String>,
}

impl EnvVarDescriptor {
    /// Create a descriptor with no default or help
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            help: None,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Conversion for arguments that may be one name or many
pub trait IntoNames {
    /// Convert into a list of names
    fn into_names(self) -> Vec<String>;
}

impl IntoNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoNames for &String {
    fn into_names(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: AsRef<str>> IntoNames for &[S] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> IntoNames for Vec<S> {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoNames for [S; N] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

/// Process-wide registry of environment variables.
///
/// Constructed once at startup and shared (usually behind an `Arc`) with
/// every task module. All methods take `&self`; associations may be added
/// from any number of call sites and are commutative and idempotent.
pub struct EnvironmentRegistry {
    source: Box<dyn EnvSource>,
    variables: Mutex<BTreeMap<String, EnvironmentVariable>>,
}

impl fmt::Debug for EnvironmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentRegistry")
            .field("variables", &self.lock().len())
            .finish()
    }
}

impl Default for EnvironmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentRegistry {
    /// Create a registry reading from the process environment
    pub fn new() -> Self {
        Self::with_source(ProcessEnv)
    }

    /// Create a registry reading from the given source
    pub fn with_source(source: impl EnvSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            variables: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, EnvironmentVariable>> {
        self.variables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a variable's default and help text.
    ///
    /// Registering a name again replaces default and help but keeps the
    /// tasks already associated with it.
    pub fn register(&self, descriptor: EnvVarDescriptor) {
        trace!(name = %descriptor.name, "registering environment variable");
        let mut variables = self.lock();
        let entry = variables
            .entry(descriptor.name.clone())
            .or_insert_with(|| EnvironmentVariable::undeclared(&descriptor.name));
        entry.default = descriptor.default;
        entry.help = descriptor.help;
    }

    /// Replace only the default value of a variable
    pub fn set_default(&self, name: &str, value: impl Into<String>) {
        let mut variables = self.lock();
        let entry = variables
            .entry(name.to_string())
            .or_insert_with(|| EnvironmentVariable::undeclared(name));
        entry.default = Some(value.into());
    }

    /// Record that every task in `tasks` reads every variable in `names`
    pub fn associate(&self, names: impl IntoNames, tasks: impl IntoNames) {
        let names = names.into_names();
        let tasks = tasks.into_names();
        let mut variables = self.lock();
        for name in &names {
            let entry = variables
                .entry(name.clone())
                .or_insert_with(|| EnvironmentVariable::undeclared(name));
            entry.tasks.extend(tasks.iter().cloned());
        }
    }

    /// Resolve a variable: environment value, then registered default
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.resolve_with_fallbacks(name, &[])
    }

    /// Resolve a variable, consulting `fallbacks` in order before the
    /// registered default of `name`. Empty values count as unset.
    pub fn resolve_with_fallbacks(&self, name: &str, fallbacks: &[&str]) -> Option<String> {
        let from_env = std::iter::once(name)
            .chain(fallbacks.iter().copied())
            .find_map(|candidate| {
                self.source
                    .get(candidate)
                    .filter(|value| !value.is_empty())
                    .map(|value| (candidate, value))
            });

        if let Some((candidate, value)) = from_env {
            if candidate != name {
                debug!(name, fallback = candidate, "resolved from fallback variable");
            }
            self.touch(name);
            return Some(value);
        }

        let mut variables = self.lock();
        variables
            .entry(name.to_string())
            .or_insert_with(|| EnvironmentVariable::undeclared(name))
            .default
            .clone()
            .filter(|value| !value.is_empty())
    }

    /// Resolve a delimited list, trimming entries and dropping empty ones
    pub fn resolve_array(&self, name: &str, delimiter: &str) -> Vec<String> {
        self.resolve(name)
            .map(|value| split_list(&value, delimiter))
            .unwrap_or_default()
    }

    /// Resolve a boolean flag. `1`, `true` and `yes` (any case) are true;
    /// anything else, including an unset variable, is false.
    pub fn resolve_flag(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|value| is_truthy(&value))
    }

    /// Resolve a base-10 number. An unset variable yields `Ok(None)`; a set
    /// but unparsable one is an error naming the variable.
    pub fn resolve_number<T: FromStr>(&self, name: &str) -> Result<Option<T>, EnvError> {
        match self.resolve(name) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| EnvError::NotANumber {
                    name: name.to_string(),
                    value,
                }),
        }
    }

    /// Resolve a variable that must have a value for `task` to run
    pub fn require(&self, name: &str, task: &str) -> Result<String, EnvError> {
        self.resolve(name).ok_or_else(|| EnvError::Missing {
            name: name.to_string(),
            task: Some(task.to_string()),
        })
    }

    /// Look up a single variable
    pub fn variable(&self, name: &str) -> Option<EnvironmentVariable> {
        self.lock().get(name).cloned()
    }

    /// All known variables, sorted by name
    pub fn variables(&self) -> Vec<EnvironmentVariable> {
        self.lock().values().cloned().collect()
    }

    /// Variables read by a task, sorted by name
    pub fn variables_for_task(&self, task: &str) -> Vec<String> {
        self.lock()
            .values()
            .filter(|variable| variable.tasks.contains(task))
            .map(|variable| variable.name.clone())
            .collect()
    }

    fn touch(&self, name: &str) {
        self.lock()
            .entry(name.to_string())
            .or_insert_with(|| EnvironmentVariable::undeclared(name));
    }
}

fn split_list(value: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        let trimmed = value.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
