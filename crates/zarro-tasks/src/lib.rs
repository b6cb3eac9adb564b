//! zarro tasks - task discovery and execution
//!
//! This crate collects tasks from package.json, the built-in modules and the
//! project's task module directories, plans them into a dependency DAG and
//! runs them. It also provides the test sequencer used to order and shard
//! test files.

pub mod builtin;
pub mod dag;
pub mod discovery;
pub mod module;
pub mod npm;
pub mod registry;
pub mod reporter;
pub mod scheduler;
pub mod sequencer;
pub mod task;

pub use dag::{DagError, TaskDag, TaskNode};
pub use discovery::{DiscoveryError, DiscoveryOptions, TaskDiscovery};
pub use module::TaskModule;
pub use registry::{TaskRegistrar, TaskRegistry};
pub use reporter::{CollectingReporter, TaskEvent, TaskReporter, TracingReporter};
pub use scheduler::{SchedulerOptions, TaskResult, TaskScheduler, TaskStatus};
pub use sequencer::{shard, SequencerError, ShardSpec, TestFile, TestSequencer};
pub use task::{CommandSpec, TaskAction, TaskContext, TaskDefinition, TaskError, TaskSource};
