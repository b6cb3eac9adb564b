//! `push`: publish packed .nupkg files

use zarro_core::env::known::{
    DOTNET_CLI, NUGET_API_KEY, NUGET_PUSH_SOURCE, NUGET_SOURCE, PACK_TARGET_FOLDER,
};

use crate::registry::TaskRegistrar;
use crate::task::{CommandSpec, TaskContext, TaskDefinition, TaskError};

use super::{dotnet, path_arg};

pub fn register(registrar: &mut TaskRegistrar<'_>) {
    registrar.associate(
        [
            NUGET_API_KEY,
            NUGET_PUSH_SOURCE,
            NUGET_SOURCE,
            PACK_TARGET_FOLDER,
            DOTNET_CLI,
        ],
        "push",
    );
    registrar.task(
        TaskDefinition::new("push")
            .with_help("Push packages in PACK_TARGET_FOLDER to NUGET_PUSH_SOURCE")
            .with_depends_on("pack")
            .with_commands(commands),
    );
}

fn commands(ctx: &TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> {
    let api_key = ctx.require(NUGET_API_KEY)?;
    // Environment NUGET_PUSH_SOURCE, then environment NUGET_SOURCE, then the
    // registered NUGET_SOURCE default.
    let source = ctx
        .env
        .resolve_with_fallbacks(NUGET_PUSH_SOURCE, &[NUGET_SOURCE])
        .or_else(|| ctx.env.resolve(NUGET_SOURCE))
        .ok_or_else(|| zarro_core::EnvError::Missing {
            name: NUGET_PUSH_SOURCE.to_string(),
            task: Some(ctx.task.to_string()),
        })?;
    let folder = ctx.require(PACK_TARGET_FOLDER)?;

    let packages = ctx.glob(&format!("{}/*.nupkg", folder))?;
    if packages.is_empty() {
        return Err(TaskError::NoMatches {
            task: ctx.task.to_string(),
            pattern: format!("{}/*.nupkg", folder),
        });
    }

    Ok(packages
        .iter()
        .map(|package| {
            dotnet(ctx)
                .args(["nuget", "push"])
                .arg(path_arg(package))
                .args(["--source", &source])
                .arg("--api-key")
                .secret_arg(api_key.clone())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{builtins, commands_for, touch};
    use tempfile::TempDir;

    #[test]
    fn test_push_requires_api_key() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["packages/App.1.0.0.nupkg"]);
        let (registry, env) = builtins(&[]);
        let err = commands_for(&registry, &env, "push", temp.path()).unwrap_err();
        assert!(err.to_string().contains("NUGET_API_KEY"));
        assert!(err.to_string().contains("push"));
    }

    #[test]
    fn test_push_masks_api_key() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["packages/App.1.0.0.nupkg"]);
        let (registry, env) = builtins(&[("NUGET_API_KEY", "oy2abc")]);

        let commands = commands_for(&registry, &env, "push", temp.path()).unwrap();
        assert_eq!(
            commands,
            vec!["dotnet nuget push packages/App.1.0.0.nupkg --source nuget.org --api-key ***"]
        );
    }

    #[test]
    fn test_push_source_falls_back_to_nuget_source() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["packages/App.1.0.0.nupkg"]);
        let (registry, env) = builtins(&[
            ("NUGET_API_KEY", "key"),
            ("NUGET_SOURCE", "https://nuget.example.com/v3/index.json"),
        ]);
        let commands = commands_for(&registry, &env, "push", temp.path()).unwrap();
        assert!(commands[0].contains("--source https://nuget.example.com/v3/index.json"));
    }

    #[test]
    fn test_push_source_preferred_over_nuget_source() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["packages/App.1.0.0.nupkg"]);
        let (registry, env) = builtins(&[
            ("NUGET_API_KEY", "key"),
            ("NUGET_SOURCE", "https://restore.example.com"),
            ("NUGET_PUSH_SOURCE", "https://push.example.com"),
        ]);

        let commands = commands_for(&registry, &env, "push", temp.path()).unwrap();
        assert!(commands[0].contains("--source https://push.example.com"));
    }

    #[test]
    fn test_push_without_packages_fails() {
        let temp = TempDir::new().unwrap();
        let (registry, env) = builtins(&[("NUGET_API_KEY", "key")]);
        assert!(commands_for(&registry, &env, "push", temp.path()).is_err());
    }
}
