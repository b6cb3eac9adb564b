//! Git tasks: `tag`, `push-tags` and `update-submodules`

use zarro_core::env::known::{GIT_REMOTE, GIT_TAG};

use crate::registry::TaskRegistrar;
use crate::task::{CommandSpec, TaskContext, TaskDefinition, TaskError};

pub fn register(registrar: &mut TaskRegistrar<'_>) {
    registrar.associate(GIT_TAG, "tag");
    registrar.associate(GIT_REMOTE, "push-tags");

    registrar.task(
        TaskDefinition::new("tag")
            .with_help("Create an annotated tag named by GIT_TAG")
            .with_commands(tag),
    );
    registrar.task(
        TaskDefinition::new("push-tags")
            .with_help("Push tags to GIT_REMOTE")
            .with_commands(push_tags),
    );
    registrar.task(
        TaskDefinition::new("update-submodules")
            .with_help("Initialise and update all submodules")
            .with_commands(|_| {
                Ok(vec![CommandSpec::new("git").args([
                    "submodule",
                    "update",
                    "--init",
                    "--recursive",
                ])])
            }),
    );
}

fn tag(ctx: &TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> {
    let tag = ctx.require(GIT_TAG)?;
    Ok(vec![CommandSpec::new("git")
        .args(["tag", "-a", &tag, "-m"])
        .arg(format!("release {}", tag))])
}

fn push_tags(ctx: &TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> {
    let remote = ctx.require(GIT_REMOTE)?;
    Ok(vec![CommandSpec::new("git").args(["push", &remote, "--tags"])])
}

#[cfg(test)]
mod tests {
    use super::super::testing::{builtins, commands_for};
    use crate::task::TaskError;
    use std::path::Path;

    #[test]
    fn test_tag_requires_git_tag() {
        let (registry, env) = builtins(&[]);
        let err = commands_for(&registry, &env, "tag", Path::new(".")).unwrap_err();
        assert!(matches!(err, TaskError::Env(_)));
        assert!(err.to_string().contains("GIT_TAG"));
    }

    #[test]
    fn test_tag_and_push() {
        let (registry, env) = builtins(&[("GIT_TAG", "v1.2.0"), ("GIT_REMOTE", "upstream")]);
        assert_eq!(
            commands_for(&registry, &env, "tag", Path::new(".")).unwrap(),
            vec!["git tag -a v1.2.0 -m \"release v1.2.0\""]
        );
        assert_eq!(
            commands_for(&registry, &env, "push-tags", Path::new(".")).unwrap(),
            vec!["git push upstream --tags"]
        );
    }

    #[test]
    fn test_update_submodules() {
        let (registry, env) = builtins(&[]);
        assert_eq!(
            commands_for(&registry, &env, "update-submodules", Path::new(".")).unwrap(),
            vec!["git submodule update --init --recursive"]
        );
    }
}
