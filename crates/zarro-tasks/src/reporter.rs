//! Task execution reporting

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Events emitted during task execution
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A task is starting execution
    Started { task: String },
    /// A task is about to spawn a command (or would, in a dry run)
    Command { task: String, command: String },
    /// A task produced output
    Output {
        task: String,
        line: String,
        is_stderr: bool,
    },
    /// A task completed successfully
    Completed { task: String, duration: Duration },
    /// A task failed
    Failed {
        task: String,
        duration: Duration,
        error: String,
    },
    /// A task was not run
    Skipped { task: String, reason: String },
    /// An execution wave is starting
    WaveStarted { wave: usize, task_count: usize },
    /// All tasks completed
    AllCompleted {
        total: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        duration: Duration,
    },
}

/// Trait for reporting task execution progress
pub trait TaskReporter: Send + Sync {
    /// Handle a task event
    fn report(&self, event: &TaskEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started { task } => {
                tracing::info!(task = %task, "starting task");
            }
            TaskEvent::Command { task, command } => {
                tracing::info!(task = %task, "{}", command);
            }
            TaskEvent::Output {
                task,
                line,
                is_stderr,
            } => {
                if *is_stderr {
                    tracing::warn!("[{}] {}", task, line);
                } else {
                    tracing::debug!("[{}] {}", task, line);
                }
            }
            TaskEvent::Completed { task, duration } => {
                tracing::info!("{} completed in {:.1}s", task, duration.as_secs_f64());
            }
            TaskEvent::Failed {
                task,
                duration,
                error,
            } => {
                tracing::error!(
                    "{} failed after {:.1}s: {}",
                    task,
                    duration.as_secs_f64(),
                    error
                );
            }
            TaskEvent::Skipped { task, reason } => {
                tracing::info!("{} skipped: {}", task, reason);
            }
            TaskEvent::WaveStarted { wave, task_count } => {
                tracing::debug!("Starting wave {} ({} tasks)", wave, task_count);
            }
            TaskEvent::AllCompleted {
                total,
                succeeded,
                failed,
                skipped,
                duration,
            } => {
                tracing::info!(
                    "All tasks complete: {}/{} succeeded, {} failed, {} skipped ({:.1}s)",
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

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Commands reported so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TaskEvent::Command { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
