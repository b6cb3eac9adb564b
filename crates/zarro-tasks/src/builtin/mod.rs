//! Tasks compiled into zarro
//!
//! Each module registers its tasks through a [`TaskRegistrar`]. Modules are
//! registered in the order of [`MODULES`], which is alphabetical like a
//! directory listing; project task modules loaded later replace any of these
//! by name.

mod build;
mod clean;
mod git;
mod pack;
mod push;
mod release;

use std::path::Path;

use zarro_core::env::known::{register_known, DOTNET_CLI};

use crate::registry::TaskRegistrar;
use crate::task::{CommandSpec, TaskContext};

/// Registration function of a built-in module
pub type RegisterFn = fn(&mut TaskRegistrar<'_>);

/// Built-in modules in registration order
pub const MODULES: &[(&str, RegisterFn)] = &[
    ("build", build::register),
    ("clean", clean::register),
    ("git", git::register),
    ("pack", pack::register),
    ("push", push::register),
    ("release", release::register),
    ("test", test::register),
];

/// Declare the well-known variables and register every built-in module
pub fn register_all(registrar: &mut TaskRegistrar<'_>) {
    register_known(registrar.env());
    for (name, register) in MODULES {
        tracing::trace!(module = name, "registering built-in module");
        register(registrar);
    }
}

/// A `dotnet` invocation using the configured executable
fn dotnet(ctx: &TaskContext<'_>) -> CommandSpec {
    CommandSpec::new(
        ctx.env
            .resolve(DOTNET_CLI)
            .unwrap_or_else(|| "dotnet".to_string()),
    )
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use zarro_core::env::known::register_known;
    use zarro_core::env::MapEnv;
    use zarro_core::EnvironmentRegistry;

    use crate::registry::{TaskRegistrar, TaskRegistry};
    use crate::task::{CommandSpec, TaskContext, TaskError, TaskSource};

    /// Register all built-ins against an environment holding `values`
    pub fn builtins(values: &[(&str, &str)]) -> (TaskRegistry, EnvironmentRegistry) {
        let env = EnvironmentRegistry::with_source(values.iter().copied().collect::<MapEnv>());
        register_known(&env);
        let mut registry = TaskRegistry::new();
        let mut registrar = TaskRegistrar::new(&mut registry, &env, TaskSource::BuiltIn);
        super::register_all(&mut registrar);
        (registry, env)
    }

    /// Commands a built-in task would run in `root`
    pub fn commands_for(
        registry: &TaskRegistry,
        env: &EnvironmentRegistry,
        task: &str,
        root: &Path,
    ) -> Result<Vec<String>, TaskError> {
        let definition = registry.get(task).expect("task is registered");
        let ctx = TaskContext::new(task, env, root);
        let commands: Vec<CommandSpec> = definition.action.commands(&ctx)?;
        Ok(commands.iter().map(ToString::to_string).collect())
    }

    /// Create empty files under `root`
    pub fn touch(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, "").unwrap();
        }
    }
}
