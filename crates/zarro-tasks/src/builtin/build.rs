//! `build`: dotnet build over every match of BUILD_INCLUDE

use zarro_core::env::known::{BUILD_CONFIGURATION, BUILD_INCLUDE, BUILD_VERBOSITY, DOTNET_CLI};

use crate::registry::TaskRegistrar;
use crate::task::{CommandSpec, TaskContext, TaskDefinition, TaskError};

use super::{dotnet, path_arg};

pub fn register(registrar: &mut TaskRegistrar<'_>) {
    registrar.associate(
        [BUILD_CONFIGURATION, BUILD_VERBOSITY, BUILD_INCLUDE, DOTNET_CLI],
        "build",
    );
    registrar.task(
        TaskDefinition::new("build")
            .with_help("Build every solution or project matched by BUILD_INCLUDE")
            .with_commands(commands),
    );
}

fn commands(ctx: &TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> {
    let configuration = ctx.require(BUILD_CONFIGURATION)?;
    let verbosity = ctx.require(BUILD_VERBOSITY)?;

    Ok(ctx
        .includes(BUILD_INCLUDE)?
        .iter()
        .map(|target| {
            dotnet(ctx)
                .arg("build")
                .arg(path_arg(target))
                .args(["--configuration", &configuration])
                .args(["--verbosity", &verbosity])
        })
        .collect())
}
