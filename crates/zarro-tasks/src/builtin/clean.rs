//! `clean`: dotnet clean over the build targets

use zarro_core::env::known::{BUILD_CONFIGURATION, BUILD_INCLUDE, DOTNET_CLI};

use crate::registry::TaskRegistrar;
use crate::task::{CommandSpec, TaskContext, TaskDefinition, TaskError};

use super::{dotnet, path_arg};

pub fn register(registrar: &mut TaskRegistrar<'_>) {
    registrar.associate([BUILD_CONFIGURATION, BUILD_INCLUDE, DOTNET_CLI], "clean");
    registrar.task(
        TaskDefinition::new("clean")
            .with_help("Clean the outputs of every build target")
            .with_commands(commands),
    );
}

fn commands(ctx: &TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> {
    let configuration = ctx.require(BUILD_CONFIGURATION)?;
    Ok(ctx
        .includes(BUILD_INCLUDE)?
        .iter()
        .map(|target| {
            dotnet(ctx)
                .arg("clean")
                .arg(path_arg(target))
                .args(["--configuration", &configuration])
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{builtins, commands_for, touch};
    use tempfile::TempDir;

    #[test]
    fn test_clean_uses_custom_dotnet() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["App.sln"]);
        let (registry, env) = builtins(&[("DOTNET_CLI", "/opt/dotnet/dotnet")]);

        let commands = commands_for(&registry, &env, "clean", temp.path()).unwrap();
        assert_eq!(
            commands,
            vec!["/opt/dotnet/dotnet clean App.sln --configuration Release"]
        );
    }
}
