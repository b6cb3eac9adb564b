//! Import package.json scripts as tasks

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::discovery::DiscoveryError;
use crate::module::is_valid_task_name;
use crate::registry::TaskRegistrar;
use crate::task::TaskDefinition;

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

fn invokes_zarro() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(^|[\s;&|(/])zarro(\s|$|[;&|)])").expect("zarro invocation pattern is valid")
    })
}

/// Register every script in `<root>/package.json` as a task running
/// `npm run <script>`. Scripts that call zarro themselves are skipped, since
/// running them as tasks would start zarro inside zarro for the same task.
pub fn import_package_scripts(
    root: &Path,
    registrar: &mut TaskRegistrar<'_>,
) -> Result<usize, DiscoveryError> {
    let path = root.join("package.json");
    if !path.is_file() {
        debug!(path = %path.display(), "no package.json, skipping script import");
        return Ok(0);
    }

    let content = std::fs::read_to_string(&path).map_err(|source| DiscoveryError::Read {
        path: path.clone(),
        source,
    })?;
    let package: PackageJson =
        serde_json::from_str(&content).map_err(|source| DiscoveryError::PackageJson {
            path: path.clone(),
            source,
        })?;

    let mut imported = 0;
    for (name, body) in package.scripts {
        if !is_valid_task_name(&name) {
            debug!(script = %name, "script name is not a valid task name, skipping");
            continue;
        }
        if invokes_zarro().is_match(&body) {
            debug!(script = %name, "script invokes zarro, skipping");
            continue;
        }
        registrar.task(
            TaskDefinition::new(name.clone())
                .with_help(format!("npm script: {}", body))
                .with_shell(format!("npm run {}", name)),
        );
        imported += 1;
    }

    info!(imported, "imported package.json scripts");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskRegistry;
    use crate::task::{TaskAction, TaskSource};
    use tempfile::TempDir;
    use zarro_core::env::MapEnv;
    use zarro_core::EnvironmentRegistry;

    fn import(content: Option<&str>) -> (Result<usize, DiscoveryError>, TaskRegistry) {
        let temp = TempDir::new().unwrap();
        if let Some(content) = content {
            std::fs::write(temp.path().join("package.json"), content).unwrap();
        }
        let env = EnvironmentRegistry::with_source(MapEnv::new());
        let mut registry = TaskRegistry::new();
        let mut registrar = TaskRegistrar::new(&mut registry, &env, TaskSource::PackageScript);
        let result = import_package_scripts(temp.path(), &mut registrar);
        (result, registry)
    }

    #[test]
    fn test_imports_scripts() {
        let (result, registry) = import(Some(
            r#"{ "name": "app", "scripts": { "lint": "eslint .", "test": "jest" } }"#,
        ));
        assert_eq!(result.unwrap(), 2);
        let lint = registry.get("lint").unwrap();
        assert_eq!(lint.source, TaskSource::PackageScript);
        assert!(matches!(&lint.action, TaskAction::Shell(lines) if lines[0] == "npm run lint"));
    }

    #[test]
    fn test_skips_scripts_that_call_zarro() {
        let (result, registry) = import(Some(
            r#"{ "scripts": { "build": "zarro build", "release": "npm test && zarro release", "zarrology": "echo zarrology" } }"#,
        ));
        assert_eq!(result.unwrap(), 1);
        assert!(!registry.contains("build"));
        assert!(!registry.contains("release"));
        assert!(registry.contains("zarrology"));
    }

    #[test]
    fn test_missing_package_json() {
        let (result, registry) = import(None);
        assert_eq!(result.unwrap(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broken_package_json() {
        let (result, _) = import(Some("{ not json"));
        assert!(matches!(result, Err(DiscoveryError::PackageJson { .. })));
    }
}
