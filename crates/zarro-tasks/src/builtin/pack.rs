//! `pack`: dotnet pack into PACK_TARGET_FOLDER

use zarro_core::env::known::{BUILD_CONFIGURATION, DOTNET_CLI, PACK_INCLUDE, PACK_TARGET_FOLDER};

use crate::registry::TaskRegistrar;
use crate::task::{CommandSpec, TaskContext, TaskDefinition, TaskError};

use super::{dotnet, path_arg};

pub fn register(registrar: &mut TaskRegistrar<'_>) {
    registrar.associate(
        [BUILD_CONFIGURATION, PACK_INCLUDE, PACK_TARGET_FOLDER, DOTNET_CLI],
        "pack",
    );
    registrar.task(
        TaskDefinition::new("pack")
            .with_help("Create NuGet packages for every project matched by PACK_INCLUDE")
            .with_depends_on("build")
            .with_commands(commands),
    );
}

fn commands(ctx: &TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> {
    let configuration = ctx.require(BUILD_CONFIGURATION)?;
    let output = ctx.require(PACK_TARGET_FOLDER)?;

    Ok(ctx
        .includes(PACK_INCLUDE)?
        .iter()
        .map(|project| {
            dotnet(ctx)
                .arg("pack")
                .arg(path_arg(project))
                .args(["--configuration", &configuration])
                .args(["--output", &output])
                .arg("--no-build")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{builtins, commands_for, touch};
    use tempfile::TempDir;

    #[test]
    fn test_pack_depends_on_build() {
        let (registry, _) = builtins(&[]);
        assert_eq!(registry.get("pack").unwrap().depends_on, vec!["build"]);
    }

    #[test]
    fn test_pack_projects() {
        let temp = TempDir::new().unwrap();
        touch(
            temp.path(),
            &["src/Core/Core.csproj", "src/Core.Tests/Core.Tests.csproj"],
        );
        let (registry, env) = builtins(&[
            ("PACK_INCLUDE", "src/Core/*.csproj"),
            ("PACK_TARGET_FOLDER", "dist"),
        ]);

        let commands = commands_for(&registry, &env, "pack", temp.path()).unwrap();
        assert_eq!(
            commands,
            vec!["dotnet pack src/Core/Core.csproj --configuration Release --output dist --no-build"]
        );
    }
}
