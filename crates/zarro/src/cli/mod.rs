//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgGroup, Args, Parser};
use tracing::{debug, info};

use zarro_core::config::{apply_env_defaults, load_config_or_default};
use zarro_core::env::known::MAX_CONCURRENCY;
use zarro_core::{Config, EnvironmentRegistry};
use zarro_tasks::sequencer::ShardSpec;
use zarro_tasks::{DiscoveryOptions, TaskDiscovery, TaskRegistry};

/// zarro - run build, test, pack and release tasks for .NET projects
///
/// Any arguments that are not options are task names, run in the order
/// given. Tasks are configured through environment variables; see
/// --show-env for the full list.
#[derive(Debug, Parser)]
#[command(name = "zarro")]
#[command(author, version, about, long_about)]
#[command(group(
    ArgGroup::new("mode")
        .multiple(false)
        .args(["init", "show_env", "create_task", "list", "sequence_tests"])
))]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Write a zarro.toml and create the local-tasks directory
    #[arg(long)]
    pub init: bool,

    /// Show the environment variables tasks read
    #[arg(long = "show-env", visible_alias = "show-environment")]
    pub show_env: bool,

    /// Create a task module in local-tasks/
    #[arg(long, value_name = "NAME")]
    pub create_task: Option<String>,

    /// Overwrite files written by --init or --create-task
    #[arg(long)]
    pub force: bool,

    /// List available tasks
    #[arg(long)]
    pub list: bool,

    /// Print the given test files sharded and in run order
    #[arg(long)]
    pub sequence_tests: bool,

    /// Shard to print, eg 2/4
    #[arg(long, value_name = "INDEX/COUNT", requires = "sequence_tests")]
    pub shard: Option<ShardSpec>,

    /// JSON file mapping test paths to previous durations in milliseconds
    #[arg(long, value_name = "FILE", requires = "sequence_tests")]
    pub durations: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunOptions,

    /// Tasks to run (or test files, with --sequence-tests)
    #[arg(value_name = "TASK")]
    pub args: Vec<String>,
}

/// Options for running tasks
#[derive(Debug, Clone, Args)]
pub struct RunOptions {
    /// Print the commands tasks would run without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running tasks that do not depend on a failed task
    #[arg(long)]
    pub continue_on_error: bool,

    /// Maximum number of independent tasks run at once
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Outcomes that end the run with a dedicated exit code
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0} task{} failed", if *.0 == 1 { "" } else { "s" })]
    TasksFailed(usize),

    #[error("Cancelled")]
    Cancelled,
}

/// Everything known about the project zarro runs in
pub struct Project {
    /// Project root (the working directory)
    pub root: PathBuf,
    /// Loaded configuration
    pub config: Config,
    /// Configuration file, when one was found
    pub config_path: Option<PathBuf>,
    /// Shared environment registry
    pub env: Arc<EnvironmentRegistry>,
}

impl Project {
    /// Load configuration for `root`. Tasks are not discovered yet.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let (config, config_path) = load_config_or_default(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            config_path,
            env: Arc::new(EnvironmentRegistry::new()),
        })
    }

    /// Discover every task, then apply the project's `[env]` defaults on top
    /// of the defaults the task modules registered
    pub fn discover(&self) -> anyhow::Result<TaskRegistry> {
        let options = DiscoveryOptions::from_config(&self.root, &self.config.discovery);
        let tasks = TaskDiscovery::new(options).discover(&self.env)?;
        apply_env_defaults(&self.config, &self.env);
        if let Some(concurrency) = self.config.tasks.concurrency {
            self.env.set_default(MAX_CONCURRENCY, concurrency.to_string());
        }
        debug!(tasks = tasks.len(), "tasks discovered");
        Ok(tasks)
    }
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(self) -> anyhow::Result<i32> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }
        let cwd = std::env::current_dir()?;
        info!(cwd = %cwd.display(), "zarro starting");

        if self.init {
            return commands::init::execute(&self, &cwd);
        }
        if let Some(name) = &self.create_task {
            return commands::create_task::execute(&self, &cwd, name);
        }

        let project = Project::load(&cwd)?;
        if self.sequence_tests {
            return commands::sequence::execute(&self, &project);
        }

        let tasks = project.discover()?;
        if self.show_env {
            commands::show_env::execute(&self, &project)
        } else if self.list || self.args.is_empty() {
            commands::list::execute(&self, &tasks)
        } else {
            commands::run::execute(&self, &project, &tasks)
        }
    }

    pub fn is_text(&self) -> bool {
        self.format == OutputFormat::Text
    }
}
