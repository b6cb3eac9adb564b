//! Environment variable registry
//!
//! Every piece of configuration a task reads comes from an environment
//! variable. The [`EnvironmentRegistry`] resolves those variables (process
//! environment first, then fallbacks, then registered defaults) and records
//! which tasks consume which variables so `--show-env` can document them.

pub mod known;
mod registry;
mod source;

pub use registry::{EnvVarDescriptor, EnvironmentRegistry, EnvironmentVariable, IntoNames};
pub use source::{EnvSource, MapEnv, ProcessEnv};

/// Set in the environment of every process zarro spawns, so a nested
/// invocation can tell it is running underneath another one.
pub const RUNNING_MARKER: &str = "ZARRO_RUNNING";
