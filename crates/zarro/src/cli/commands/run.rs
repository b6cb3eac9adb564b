//! Run command: execute the requested tasks and their dependencies

use std::sync::Arc;

use console::style;
use tracing::{info, warn};

use zarro_core::env::known::{DRY_RUN, MAX_CONCURRENCY};
use zarro_core::ConfigError;
use zarro_tasks::{
    SchedulerOptions, TaskDag, TaskEvent, TaskRegistry, TaskReporter, TaskScheduler, TaskStatus,
    TracingReporter,
};

use crate::cli::output::{self, plural};
use crate::cli::{Cli, CliError, OutputFormat, Project};
use crate::exit_codes;

pub fn execute(cli: &Cli, project: &Project, tasks: &TaskRegistry) -> anyhow::Result<i32> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute_async(cli, project, tasks))
}

async fn execute_async(cli: &Cli, project: &Project, tasks: &TaskRegistry) -> anyhow::Result<i32> {
    let dag = TaskDag::build(tasks, &cli.args)?;
    let options = scheduler_options(cli, project)?;
    info!(
        tasks = dag.len(),
        concurrency = options.concurrency,
        dry_run = options.dry_run,
        "running tasks"
    );

    if !cli.quiet && cli.is_text() {
        output::info(&format!(
            "{} in {}",
            plural(dag.len(), "task"),
            plural(dag.waves().len(), "wave")
        ));
        if cli.verbose || options.dry_run {
            println!();
            print!("{}", dag.execution_plan());
        }
        if options.dry_run {
            println!(
                "{}",
                style("[DRY RUN - commands are printed, not run]").yellow().bold()
            );
        }
        println!();
    }

    let reporter: Arc<dyn TaskReporter> = if cli.quiet || !cli.is_text() {
        Arc::new(TracingReporter)
    } else {
        Arc::new(ConsoleReporter::new(cli.verbose, options.dry_run))
    };

    let scheduler = TaskScheduler::new(options, project.env.clone(), reporter);
    let results = tokio::select! {
        results = scheduler.execute(&dag) => results,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping running tasks");
            return Err(CliError::Cancelled.into());
        }
    };

    let failed: Vec<_> = results.iter().filter(|r| r.status.is_failure()).collect();

    if cli.format == OutputFormat::Json {
        let summary = serde_json::json!({
            "total": results.len(),
            "succeeded": results.iter().filter(|r| r.status.is_success()).count(),
            "failed": failed.len(),
            "tasks": results.iter().map(|r| {
                let (status, detail) = match &r.status {
                    TaskStatus::Success => ("success", None),
                    TaskStatus::DryRun => ("dry-run", None),
                    TaskStatus::Failed(error) => ("failed", Some(error.as_str())),
                    TaskStatus::Skipped(reason) => ("skipped", Some(reason.as_str())),
                };
                serde_json::json!({
                    "task": r.task,
                    "status": status,
                    "detail": detail,
                    "duration_ms": r.duration.as_millis() as u64,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if !failed.is_empty() {
        if !cli.quiet && cli.is_text() {
            println!();
            println!(
                "  {} {}/{} tasks failed:",
                style("✗").red().bold(),
                failed.len(),
                results.len()
            );
            for r in &failed {
                if let TaskStatus::Failed(ref err) = r.status {
                    println!("    {} {}: {}", style("✗").red(), r.task, err);
                }
            }
        }
        return Err(CliError::TasksFailed(failed.len()).into());
    }

    Ok(exit_codes::SUCCESS)
}

/// Flags win over the environment, which wins over the config file
fn scheduler_options(cli: &Cli, project: &Project) -> anyhow::Result<SchedulerOptions> {
    let concurrency = match cli.run.concurrency {
        Some(n) => usize::from(n),
        None => match project.env.resolve_number::<usize>(MAX_CONCURRENCY)? {
            Some(n) if n > 0 => n,
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    field: MAX_CONCURRENCY.to_string(),
                    message: "must be at least 1".to_string(),
                }
                .into());
            }
            None => project.config.tasks.concurrency.unwrap_or(1),
        },
    };

    Ok(SchedulerOptions {
        concurrency,
        continue_on_error: cli.run.continue_on_error || project.config.tasks.continue_on_error,
        dry_run: cli.run.dry_run || project.env.resolve_flag(DRY_RUN),
        root_dir: project.root.clone(),
    })
}

/// Console reporter with live output
struct ConsoleReporter {
    verbose: bool,
    dry_run: bool,
}

impl ConsoleReporter {
    fn new(verbose: bool, dry_run: bool) -> Self {
        Self { verbose, dry_run }
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started { task } => {
                println!("  {} {}", style("▸").dim(), style(task).bold());
            }
            TaskEvent::Command { command, .. } => {
                if self.verbose || self.dry_run {
                    println!("    {} {}", style("$").dim(), style(command).dim());
                }
            }
            TaskEvent::Output {
                task,
                line,
                is_stderr,
            } => {
                if *is_stderr {
                    println!("    {} {}", style(format!("[{}]", task)).red().dim(), line);
                } else {
                    println!("    {} {}", style(format!("[{}]", task)).dim(), line);
                }
            }
            TaskEvent::Completed { task, duration } => {
                println!(
                    "  {} {} {}",
                    style("✓").green(),
                    style(task).green(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
            }
            TaskEvent::Failed {
                task,
                duration,
                error,
            } => {
                println!(
                    "  {} {} {} {}",
                    style("✗").red(),
                    style(task).red(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim(),
                    style(error).red().dim()
                );
            }
            TaskEvent::Skipped { task, reason } => {
                println!(
                    "  {} {} {}",
                    style("○").yellow(),
                    style(task).yellow(),
                    style(format!("({})", reason)).dim()
                );
            }
            TaskEvent::WaveStarted { wave, task_count } => {
                if self.verbose {
                    println!(
                        "  {} Wave {} ({})",
                        style("─").dim(),
                        wave,
                        plural(*task_count, "task")
                    );
                }
            }
            TaskEvent::AllCompleted {
                total,
                succeeded,
                failed,
                skipped,
                duration,
            } => {
                println!();
                println!(
                    "  {} {}/{} succeeded, {} failed, {} skipped ({:.1}s)",
                    if *failed == 0 {
                        style("✓").green().bold()
                    } else {
                        style("✗").red().bold()
                    },
                    succeeded,
                    total,
                    failed,
                    skipped,
                    duration.as_secs_f64()
                );
            }
        }
    }
}
