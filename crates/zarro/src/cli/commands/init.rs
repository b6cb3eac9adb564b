//! Init command

use std::path::Path;

use anyhow::Context;
use console::{style, Term};
use dialoguer::Confirm;
use tracing::{debug, info};

use zarro_core::config::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML};
use zarro_core::DiscoveryConfig;

use crate::cli::output::{self, path_style};
use crate::cli::Cli;
use crate::exit_codes;

/// What `--init` changed
#[derive(Debug, Default, PartialEq, Eq)]
struct InitOutcome {
    config_written: bool,
    tasks_dir_created: bool,
    script_added: bool,
}

pub fn execute(cli: &Cli, root: &Path) -> anyhow::Result<i32> {
    info!(force = cli.force, "executing init command");
    let config_path = root.join(DEFAULT_CONFIG_TOML);

    let mut overwrite = cli.force;
    if config_path.exists() && !overwrite {
        if !Term::stdout().is_term() {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }
        overwrite = Confirm::new()
            .with_prompt(format!(
                "Configuration file already exists at {}. Overwrite?",
                config_path.display()
            ))
            .default(false)
            .interact()?;
    }

    let outcome = initialise(root, overwrite)?;

    if !cli.quiet {
        if outcome.config_written {
            output::success(&format!(
                "Created configuration at {}",
                path_style().apply_to(config_path.display())
            ));
        } else {
            println!("{}", style("Kept existing configuration.").yellow());
        }
        if outcome.tasks_dir_created {
            output::success("Created local-tasks/ for project task modules");
        }
        if outcome.script_added {
            output::success("Added a \"zarro\" script to package.json");
        }
        println!();
        println!("Next steps:");
        println!("  1. Edit {} to set project defaults", config_path.display());
        println!(
            "  2. Run {} to see what tasks can be configured",
            style("zarro --show-env").cyan()
        );
        println!(
            "  3. Run {} to add a task of your own",
            style("zarro --create-task <name>").cyan()
        );
    }

    Ok(exit_codes::SUCCESS)
}

fn initialise(root: &Path, overwrite: bool) -> anyhow::Result<InitOutcome> {
    let mut outcome = InitOutcome::default();

    let config_path = root.join(DEFAULT_CONFIG_TOML);
    if overwrite || !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        outcome.config_written = true;
    }

    let tasks_dir = root.join(DiscoveryConfig::default().local_tasks);
    if !tasks_dir.is_dir() {
        std::fs::create_dir_all(&tasks_dir)
            .with_context(|| format!("Failed to create {}", tasks_dir.display()))?;
        outcome.tasks_dir_created = true;
    }

    outcome.script_added = add_package_script(root)?;
    Ok(outcome)
}

/// Add `"zarro": "zarro"` to package.json scripts, if there is a
/// package.json and it has no such script yet
fn add_package_script(root: &Path) -> anyhow::Result<bool> {
    let path = root.join("package.json");
    if !path.is_file() {
        debug!("no package.json, not adding a script");
        return Ok(false);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut package: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let Some(object) = package.as_object_mut() else {
        anyhow::bail!("{} does not contain a JSON object", path.display());
    };
    let scripts = object
        .entry("scripts")
        .or_insert_with(|| serde_json::Value::Object(Default::default()));
    let Some(scripts) = scripts.as_object_mut() else {
        anyhow::bail!("\"scripts\" in {} is not an object", path.display());
    };
    if scripts.contains_key("zarro") {
        return Ok(false);
    }
    scripts.insert("zarro".to_string(), serde_json::Value::from("zarro"));

    let mut updated = serde_json::to_string_pretty(&package)?;
    updated.push('\n');
    std::fs::write(&path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
