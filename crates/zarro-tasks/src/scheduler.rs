//! Task scheduler: runs a DAG wave by wave on tokio

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::debug;

use zarro_core::env::RUNNING_MARKER;
use zarro_core::EnvironmentRegistry;

use crate::dag::TaskDag;
use crate::reporter::{TaskEvent, TaskReporter};
use crate::task::{CommandSpec, TaskContext, TaskDefinition};

/// Result of a single task execution
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task that was executed
    pub task: String,
    /// Whether the task succeeded
    pub status: TaskStatus,
    /// How long the task took
    pub duration: Duration,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl TaskResult {
    fn new(task: &str, status: TaskStatus, duration: Duration) -> Self {
        Self {
            task: task.to_string(),
            status,
            duration,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Task execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed successfully
    Success,
    /// Commands were reported but not run
    DryRun,
    /// Task failed
    Failed(String),
    /// Task was not run
    Skipped(String),
}

impl TaskStatus {
    /// Check if this status represents success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::DryRun)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Options for the task scheduler
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Maximum concurrent tasks within a wave
    pub concurrency: usize,
    /// Keep going after a failure; tasks depending on a failed task are
    /// still skipped
    pub continue_on_error: bool,
    /// Report commands without running them
    pub dry_run: bool,
    /// Working directory for spawned commands
    pub root_dir: PathBuf,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            continue_on_error: false,
            dry_run: false,
            root_dir: std::env::current_dir().unwrap_or_default(),
        }
    }
}

/// Executes a DAG of tasks
pub struct TaskScheduler {
    options: SchedulerOptions,
    env: Arc<EnvironmentRegistry>,
    reporter: Arc<dyn TaskReporter>,
}

impl TaskScheduler {
    /// Create a new scheduler
    pub fn new(
        options: SchedulerOptions,
        env: Arc<EnvironmentRegistry>,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        Self {
            options,
            env,
            reporter,
        }
    }

    /// Execute all tasks in the DAG. Results are in topological order.
    pub async fn execute(&self, dag: &TaskDag) -> Vec<TaskResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut all_results: HashMap<String, TaskResult> = HashMap::new();
        let mut failed = false;

        for (wave_idx, wave) in dag.waves().iter().enumerate() {
            if failed && !self.options.continue_on_error {
                for name in wave {
                    self.skip(&mut all_results, name, "an earlier task failed");
                }
                continue;
            }

            self.reporter.report(&TaskEvent::WaveStarted {
                wave: wave_idx,
                task_count: wave.len(),
            });

            let mut handles = Vec::new();

            for name in wave {
                let Some(node) = dag.get(name) else {
                    continue;
                };

                let blocked = node
                    .definition
                    .depends_on
                    .iter()
                    .find(|dep| !all_results.get(*dep).is_some_and(|r| r.status.is_success()));
                if let Some(dep) = blocked {
                    let reason = format!("dependency '{}' did not succeed", dep);
                    self.skip(&mut all_results, name, &reason);
                    continue;
                }

                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let task = name.clone();
                let definition = node.definition.clone();
                let env = self.env.clone();
                let root_dir = self.options.root_dir.clone();
                let dry_run = self.options.dry_run;
                let reporter = self.reporter.clone();

                let handle = tokio::spawn(async move {
                    let result =
                        execute_task(&task, &definition, &env, &root_dir, dry_run, &*reporter)
                            .await;
                    drop(permit);
                    result
                });

                handles.push((name.clone(), handle));
            }

            for (name, handle) in handles {
                match handle.await {
                    Ok(result) => {
                        if result.status.is_failure() {
                            failed = true;
                        }
                        all_results.insert(name, result);
                    }
                    Err(e) => {
                        failed = true;
                        let status = TaskStatus::Failed(format!("Task panicked: {}", e));
                        let result = TaskResult::new(&name, status, Duration::ZERO);
                        all_results.insert(name, result);
                    }
                }
            }
        }

        let total = all_results.len();
        let succeeded = all_results
            .values()
            .filter(|r| r.status.is_success())
            .count();
        let failed_count = all_results
            .values()
            .filter(|r| r.status.is_failure())
            .count();
        let skipped = all_results
            .values()
            .filter(|r| matches!(r.status, TaskStatus::Skipped(_)))
            .count();

        self.reporter.report(&TaskEvent::AllCompleted {
            total,
            succeeded,
            failed: failed_count,
            skipped,
            duration: start.elapsed(),
        });

        dag.sorted()
            .iter()
            .filter_map(|name| all_results.remove(name))
            .collect()
    }

    fn skip(&self, results: &mut HashMap<String, TaskResult>, name: &str, reason: &str) {
        self.reporter.report(&TaskEvent::Skipped {
            task: name.to_string(),
            reason: reason.to_string(),
        });
        results.insert(
            name.to_string(),
            TaskResult::new(name, TaskStatus::Skipped(reason.to_string()), Duration::ZERO),
        );
    }
}

/// Execute a single task
async fn execute_task(
    task: &str,
    definition: &TaskDefinition,
    env: &EnvironmentRegistry,
    root_dir: &Path,
    dry_run: bool,
    reporter: &dyn TaskReporter,
) -> TaskResult {
    let start = Instant::now();
    reporter.report(&TaskEvent::Started {
        task: task.to_string(),
    });

    let ctx = TaskContext::new(task, env, root_dir);
    let commands = match definition.action.commands(&ctx) {
        Ok(commands) => commands,
        Err(e) => return fail(task, start, e.to_string(), reporter),
    };

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    for command in &commands {
        reporter.report(&TaskEvent::Command {
            task: task.to_string(),
            command: command.to_string(),
        });
        if dry_run {
            continue;
        }
        match run_command(task, command, root_dir, reporter).await {
            Ok((out, err)) => {
                stdout.extend(out);
                stderr.extend(err);
            }
            Err(e) => return fail(task, start, e, reporter),
        }
    }

    let duration = start.elapsed();
    if dry_run {
        reporter.report(&TaskEvent::Skipped {
            task: task.to_string(),
            reason: "dry run".to_string(),
        });
        return TaskResult::new(task, TaskStatus::DryRun, duration);
    }

    reporter.report(&TaskEvent::Completed {
        task: task.to_string(),
        duration,
    });
    TaskResult {
        task: task.to_string(),
        status: TaskStatus::Success,
        duration,
        stdout: stdout.join("\n"),
        stderr: stderr.join("\n"),
    }
}

fn fail(task: &str, start: Instant, error: String, reporter: &dyn TaskReporter) -> TaskResult {
    let duration = start.elapsed();
    reporter.report(&TaskEvent::Failed {
        task: task.to_string(),
        duration,
        error: error.clone(),
    });
    TaskResult::new(task, TaskStatus::Failed(error), duration)
}

/// Spawn one command, streaming its output to the reporter
async fn run_command(
    task: &str,
    spec: &CommandSpec,
    root_dir: &Path,
    reporter: &dyn TaskReporter,
) -> Result<(Vec<String>, Vec<String>), String> {
    debug!(task, program = %spec.program, cwd = %root_dir.display(), "spawning command");

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .env(RUNNING_MARKER, "1")
        .current_dir(root_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", spec.program, e))?;

    let (stdout_lines, stderr_lines) = tokio::join!(
        pump(child.stdout.take(), task, false, reporter),
        pump(child.stderr.take(), task, true, reporter),
    );

    let status = child
        .wait()
        .await
        .map_err(|e| format!("Failed to wait for {}: {}", spec.program, e))?;

    if status.success() {
        Ok((stdout_lines, stderr_lines))
    } else {
        match status.code() {
            Some(code) => Err(format!("{} exited with code {}", spec, code)),
            None => Err(format!("{} was terminated by a signal", spec)),
        }
    }
}

async fn pump<R: AsyncRead + Unpin>(
    stream: Option<R>,
    task: &str,
    is_stderr: bool,
    reporter: &dyn TaskReporter,
) -> Vec<String> {
    let mut collected = Vec::new();
    let Some(stream) = stream else {
        return collected;
    };
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        reporter.report(&TaskEvent::Output {
            task: task.to_string(),
            line: line.clone(),
            is_stderr,
        });
        collected.push(line);
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskRegistry;
    use crate::reporter::CollectingReporter;
    use zarro_core::env::MapEnv;

    fn registry(tasks: &[(&str, &[&str], &str)]) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for (name, deps, line) in tasks {
            let mut definition = TaskDefinition::new(*name).with_shell(*line);
            definition.depends_on = deps.iter().map(|d| d.to_string()).collect();
            registry.register(definition);
        }
        registry
    }

    async fn run(
        registry: &TaskRegistry,
        requested: &[&str],
        options: SchedulerOptions,
    ) -> (Vec<TaskResult>, Arc<CollectingReporter>) {
        let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
        let dag = TaskDag::build(registry, &requested).unwrap();
        let reporter = Arc::new(CollectingReporter::default());
        let env = Arc::new(EnvironmentRegistry::with_source(MapEnv::new()));
        let scheduler = TaskScheduler::new(options, env, reporter.clone());
        (scheduler.execute(&dag).await, reporter)
    }

    fn options(root: &Path) -> SchedulerOptions {
        SchedulerOptions {
            root_dir: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_task_status_is_success() {
        assert!(TaskStatus::Success.is_success());
        assert!(TaskStatus::DryRun.is_success());
        assert!(!TaskStatus::Failed("error".to_string()).is_success());
        assert!(!TaskStatus::Skipped("dry run".to_string()).is_success());
        assert!(TaskStatus::Failed("error".to_string()).is_failure());
    }

    #[test]
    fn test_scheduler_options_default() {
        let opts = SchedulerOptions::default();
        assert_eq!(opts.concurrency, 1);
        assert!(!opts.continue_on_error);
        assert!(!opts.dry_run);
    }

    #[tokio::test]
    async fn test_execute_dry_run() {
        let temp = tempfile::TempDir::new().unwrap();
        let registry = registry(&[("build", &[], "echo hello"), ("test", &["build"], "false")]);
        let opts = SchedulerOptions {
            dry_run: true,
            ..options(temp.path())
        };

        let (results, reporter) = run(&registry, &["test"], opts).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == TaskStatus::DryRun));
        assert_eq!(reporter.commands(), vec!["echo hello", "false"]);
        assert!(!reporter
            .events()
            .iter()
            .any(|e| matches!(e, TaskEvent::Output { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_order_and_captures_output() {
        let temp = tempfile::TempDir::new().unwrap();
        let registry = registry(&[
            ("build", &[], "echo one"),
            ("test", &["build"], "echo two; echo warn >&2"),
        ]);

        let (results, _) = run(&registry, &["test"], options(temp.path())).await;
        assert_eq!(results[0].task, "build");
        assert_eq!(results[0].stdout, "one");
        assert_eq!(results[1].status, TaskStatus::Success);
        assert_eq!(results[1].stdout, "two");
        assert_eq!(results[1].stderr, "warn");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_children_see_running_marker() {
        let temp = tempfile::TempDir::new().unwrap();
        let registry = registry(&[("probe", &[], "echo $ZARRO_RUNNING; pwd")]);

        let (results, _) = run(&registry, &["probe"], options(temp.path())).await;
        let mut lines = results[0].stdout.lines();
        assert_eq!(lines.next(), Some("1"));
        let cwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            cwd.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_skips_later_waves() {
        let temp = tempfile::TempDir::new().unwrap();
        let registry = registry(&[("build", &[], "exit 3"), ("test", &["build"], "echo never")]);

        let (results, reporter) = run(&registry, &["test"], options(temp.path())).await;
        match &results[0].status {
            TaskStatus::Failed(message) => assert!(message.contains("exited with code 3")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(results[1].status, TaskStatus::Skipped(_)));
        assert!(reporter.events().iter().any(|e| matches!(
            e,
            TaskEvent::AllCompleted { failed: 1, skipped: 1, .. }
        )));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_continue_on_error_skips_only_dependents() {
        let temp = tempfile::TempDir::new().unwrap();
        let registry = registry(&[
            ("bad", &[], "exit 1"),
            ("good", &[], "echo ok"),
            ("after", &["bad"], "echo after"),
        ]);
        let opts = SchedulerOptions {
            continue_on_error: true,
            ..options(temp.path())
        };

        let (results, _) = run(&registry, &["bad", "good", "after"], opts).await;
        let status: HashMap<_, _> = results
            .iter()
            .map(|r| (r.task.as_str(), r.status.clone()))
            .collect();
        assert!(status["bad"].is_failure());
        assert_eq!(status["good"], TaskStatus::Success);
        assert!(matches!(status["after"], TaskStatus::Skipped(_)));
    }

    #[tokio::test]
    async fn test_configuration_error_fails_task() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut registry = TaskRegistry::new();
        registry.register(TaskDefinition::new("tag").with_commands(|ctx| {
            let tag = ctx.require("GIT_TAG")?;
            Ok(vec![CommandSpec::new("git").args(["tag", &tag])])
        }));

        let (results, _) = run(&registry, &["tag"], options(temp.path())).await;
        match &results[0].status {
            TaskStatus::Failed(message) => assert!(message.contains("GIT_TAG")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut registry = TaskRegistry::new();
        registry.register(
            TaskDefinition::new("ghost")
                .with_commands(|_| Ok(vec![CommandSpec::new("zarro-no-such-program")])),
        );

        let (results, _) = run(&registry, &["ghost"], options(temp.path())).await;
        match &results[0].status {
            TaskStatus::Failed(message) => {
                assert!(message.contains("Failed to start zarro-no-such-program"))
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
