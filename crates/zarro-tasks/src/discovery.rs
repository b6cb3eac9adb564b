//! Task discovery
//!
//! Tasks are collected in a fixed sequence of steps. Every step registers
//! into the same [`TaskRegistry`], so a task defined by a later step replaces
//! one of the same name from an earlier step:
//!
//! 1. package.json scripts
//! 2. built-in modules
//! 3. `local-tasks/`
//! 4. `override-tasks/`
//! 5. `external-tasks/*/`

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};

use zarro_core::env::known::ZARRO_SKIP_NPM_TASKS;
use zarro_core::env::RUNNING_MARKER;
use zarro_core::{DiscoveryConfig, EnvironmentRegistry};

use crate::builtin;
use crate::module::load_module;
use crate::npm::import_package_scripts;
use crate::registry::{TaskRegistrar, TaskRegistry};
use crate::task::TaskSource;

/// File extension of task modules
pub const MODULE_EXTENSION: &str = "toml";

/// Errors raised while discovering tasks
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list {}: {source}", .path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse task module {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid task module {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("Failed to parse {}: {source}", .path.display())]
    PackageJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DiscoveryError {
    /// The file or directory the error is about
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::ListDir { path, .. }
            | Self::Parse { path, .. }
            | Self::Invalid { path, .. }
            | Self::PackageJson { path, .. } => path,
        }
    }
}

/// Where discovery looks for tasks
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Project root
    pub root_dir: PathBuf,
    /// Directory of local task modules, relative to the root
    pub local_tasks: PathBuf,
    /// Directory of override task modules, relative to the root
    pub override_tasks: PathBuf,
    /// Directory of external module sets, relative to the root
    pub external_tasks: PathBuf,
    /// Import package.json scripts
    pub import_npm_scripts: bool,
}

impl DiscoveryOptions {
    /// Options with the default directory names
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(root_dir, &DiscoveryConfig::default())
    }

    /// Options from the project configuration
    pub fn from_config(root_dir: impl Into<PathBuf>, config: &DiscoveryConfig) -> Self {
        Self {
            root_dir: root_dir.into(),
            local_tasks: PathBuf::from(&config.local_tasks),
            override_tasks: PathBuf::from(&config.override_tasks),
            external_tasks: PathBuf::from(&config.external_tasks),
            import_npm_scripts: config.import_npm_scripts,
        }
    }
}

/// Collects every task available in a project
#[derive(Debug, Clone)]
pub struct TaskDiscovery {
    options: DiscoveryOptions,
}

impl TaskDiscovery {
    pub fn new(options: DiscoveryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Run all discovery steps in order
    #[instrument(skip_all, fields(root = %self.options.root_dir.display()))]
    pub fn discover(&self, env: &EnvironmentRegistry) -> Result<TaskRegistry, DiscoveryError> {
        let mut tasks = TaskRegistry::new();
        let root = &self.options.root_dir;

        if self.should_import_npm(env) {
            let mut registrar = TaskRegistrar::new(&mut tasks, env, TaskSource::PackageScript);
            import_package_scripts(root, &mut registrar)?;
        }

        {
            let mut registrar = TaskRegistrar::new(&mut tasks, env, TaskSource::BuiltIn);
            builtin::register_all(&mut registrar);
            debug!(count = registrar.registered(), "registered built-in tasks");
        }

        let local = root.join(&self.options.local_tasks);
        load_directory(&local, &mut tasks, env, TaskSource::Local)?;

        let overrides = root.join(&self.options.override_tasks);
        load_directory(&overrides, &mut tasks, env, TaskSource::Override)?;

        let external = root.join(&self.options.external_tasks);
        for dir in list_dir(&external)?.into_iter().filter(|p| p.is_dir()) {
            load_directory(&dir, &mut tasks, env, TaskSource::External)?;
        }

        info!(tasks = tasks.len(), "task discovery complete");
        Ok(tasks)
    }

    fn should_import_npm(&self, env: &EnvironmentRegistry) -> bool {
        if !self.options.import_npm_scripts {
            debug!("package.json import disabled by configuration");
            return false;
        }
        if env.resolve_flag(ZARRO_SKIP_NPM_TASKS) {
            debug!("package.json import disabled by {}", ZARRO_SKIP_NPM_TASKS);
            return false;
        }
        if env.resolve_flag(RUNNING_MARKER) {
            debug!("nested zarro invocation, not importing package.json scripts");
            return false;
        }
        true
    }
}

/// Entries of a directory sorted by file name. A missing directory has no
/// entries.
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::ListDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::ListDir {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn load_directory(
    dir: &Path,
    tasks: &mut TaskRegistry,
    env: &EnvironmentRegistry,
    source: fn(PathBuf) -> TaskSource,
) -> Result<usize, DiscoveryError> {
    let mut loaded = 0;
    for path in list_dir(dir)? {
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(MODULE_EXTENSION) {
            debug!(path = %path.display(), "not a task module, skipping");
            continue;
        }
        let mut registrar = TaskRegistrar::new(tasks, env, source(path.clone()));
        loaded += load_module(&path, &mut registrar)?;
    }

    if loaded > 0 {
        debug!(dir = %dir.display(), tasks = loaded, "loaded task modules");
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskAction;
    use tempfile::TempDir;
    use zarro_core::env::MapEnv;

    fn write(root: &Path, file: &str, content: &str) {
        let path = root.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn discover(root: &Path, values: &[(&str, &str)]) -> Result<TaskRegistry, DiscoveryError> {
        let env = EnvironmentRegistry::with_source(values.iter().copied().collect::<MapEnv>());
        TaskDiscovery::new(DiscoveryOptions::new(root)).discover(&env)
    }

    fn shell_lines(registry: &TaskRegistry, name: &str) -> Vec<String> {
        match &registry.get(name).unwrap().action {
            TaskAction::Shell(lines) => lines.clone(),
            other => panic!("expected shell action for {name}, got {other:?}"),
        }
    }

    #[test]
    fn test_builtins_without_project_files() {
        let temp = TempDir::new().unwrap();
        let registry = discover(temp.path(), &[]).unwrap();
        assert_eq!(registry.get("build").unwrap().source, TaskSource::BuiltIn);
        assert!(registry.contains("release"));
    }

    #[test]
    fn test_later_steps_replace_earlier_ones() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "package.json",
            r#"{ "scripts": { "build": "tsc", "lint": "eslint ." } }"#,
        );
        write(
            temp.path(),
            "local-tasks/build.toml",
            "[[task]]\nname = \"build\"\nrun = \"make local\"\n",
        );
        write(
            temp.path(),
            "override-tasks/build.toml",
            "[[task]]\nname = \"build\"\nrun = \"make override\"\n",
        );

        let registry = discover(temp.path(), &[]).unwrap();
        assert_eq!(shell_lines(&registry, "build"), vec!["make override"]);
        assert!(matches!(
            registry.get("build").unwrap().source,
            TaskSource::Override(_)
        ));
        assert_eq!(
            registry.get("lint").unwrap().source,
            TaskSource::PackageScript
        );
    }

    #[test]
    fn test_modules_load_in_file_name_order() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "local-tasks/b.toml",
            "[[task]]\nname = \"docs\"\nrun = \"from b\"\n",
        );
        write(
            temp.path(),
            "local-tasks/a.toml",
            "[[task]]\nname = \"docs\"\nrun = \"from a\"\n",
        );
        write(temp.path(), "local-tasks/notes.md", "not a module");

        let registry = discover(temp.path(), &[]).unwrap();
        assert_eq!(shell_lines(&registry, "docs"), vec!["from b"]);
    }

    #[test]
    fn test_external_sets_load_last() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "override-tasks/docs.toml",
            "[[task]]\nname = \"docs\"\nrun = \"override\"\n",
        );
        write(
            temp.path(),
            "external-tasks/alpha/docs.toml",
            "[[task]]\nname = \"docs\"\nrun = \"alpha\"\n",
        );
        write(
            temp.path(),
            "external-tasks/beta/docs.toml",
            "[[task]]\nname = \"docs\"\nrun = \"beta\"\n",
        );

        let registry = discover(temp.path(), &[]).unwrap();
        assert_eq!(shell_lines(&registry, "docs"), vec!["beta"]);
        let source = &registry.get("docs").unwrap().source;
        assert_eq!(source.kind(), "external");
        assert!(source.path().unwrap().ends_with("beta/docs.toml"));
    }

    #[test]
    fn test_malformed_module_aborts() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "local-tasks/broken.toml", "[[task]\nname=");

        let err = discover(temp.path(), &[]).unwrap_err();
        assert!(matches!(err, DiscoveryError::Parse { .. }));
        assert!(err.path().ends_with("broken.toml"));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_npm_import_skipped_when_nested_or_disabled() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "package.json",
            r#"{ "scripts": { "lint": "eslint ." } }"#,
        );

        assert!(discover(temp.path(), &[]).unwrap().contains("lint"));
        assert!(!discover(temp.path(), &[("ZARRO_RUNNING", "1")])
            .unwrap()
            .contains("lint"));
        assert!(!discover(temp.path(), &[("ZARRO_SKIP_NPM_TASKS", "true")])
            .unwrap()
            .contains("lint"));
    }

    #[test]
    fn test_module_variables_registered() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "local-tasks/docs.toml",
            "[[task]]\nname = \"docs\"\nenv = [\"DOCS_OUTPUT\"]\n\n[[env]]\nname = \"DOCS_OUTPUT\"\ndefault = \"_site\"\n",
        );
        let env = EnvironmentRegistry::with_source(MapEnv::new());
        TaskDiscovery::new(DiscoveryOptions::new(temp.path()))
            .discover(&env)
            .unwrap();

        assert_eq!(env.resolve("DOCS_OUTPUT").as_deref(), Some("_site"));
        assert_eq!(env.variables_for_task("docs"), vec!["DOCS_OUTPUT"]);
    }

    #[test]
    fn test_custom_directories() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "build/tasks/ci.toml",
            "[[task]]\nname = \"ci\"\ndepends_on = [\"build\", \"test\"]\n",
        );
        let config = DiscoveryConfig {
            local_tasks: "build/tasks".to_string(),
            ..DiscoveryConfig::default()
        };
        let env = EnvironmentRegistry::with_source(MapEnv::new());
        let registry = TaskDiscovery::new(DiscoveryOptions::from_config(temp.path(), &config))
            .discover(&env)
            .unwrap();
        assert_eq!(registry.get("ci").unwrap().source.kind(), "local");
    }
}
