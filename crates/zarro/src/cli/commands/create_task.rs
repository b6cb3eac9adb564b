//! Scaffold a task module in local-tasks/

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use zarro_core::config::{load_config_or_default, task_module_template};
use zarro_tasks::discovery::MODULE_EXTENSION;
use zarro_tasks::module::is_valid_task_name;

use crate::cli::output::{self, path_style};
use crate::cli::Cli;
use crate::exit_codes;

pub fn execute(cli: &Cli, root: &Path, name: &str) -> anyhow::Result<i32> {
    let (config, _) = load_config_or_default(root)?;
    let dir = root.join(&config.discovery.local_tasks);
    let path = create_module(&dir, name, cli.force)?;
    info!(task = name, path = %path.display(), "created task module");

    if !cli.quiet {
        output::success(&format!(
            "Created {}",
            path_style().apply_to(path.display())
        ));
        output::info(&format!("Edit it, then run: zarro {}", name));
    }
    Ok(exit_codes::SUCCESS)
}

fn create_module(dir: &Path, name: &str, force: bool) -> anyhow::Result<PathBuf> {
    if !is_valid_task_name(name) {
        anyhow::bail!(
            "'{}' is not a valid task name (use letters, digits, '.', '_', ':' and '-')",
            name
        );
    }

    let path = dir.join(format!("{}.{}", name, MODULE_EXTENSION));
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(&path, task_module_template(name))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
