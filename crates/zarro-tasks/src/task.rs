//! Task types and definitions

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zarro_core::{EnvError, EnvironmentRegistry};

/// A process to spawn on behalf of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Text shown instead of program and arguments
    label: Option<String>,
    /// Values masked when the command is displayed
    secrets: Vec<String>,
}

impl CommandSpec {
    /// Create a command for a program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            label: None,
            secrets: Vec::new(),
        }
    }

    /// Run a line through the platform shell
    pub fn shell(line: impl Into<String>) -> Self {
        let line = line.into();
        let (program, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let mut spec = Self::new(program).arg(flag).arg(line.clone());
        spec.label = Some(line);
        spec
    }

    /// Add an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an argument that must not appear in output
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        self.secrets.push(arg.clone());
        self.args.push(arg);
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            return write!(f, "{}", label);
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if self.secrets.contains(arg) {
                write!(f, " ***")?;
            } else if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Errors raised while turning a task into commands
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Configuration could not be resolved
    #[error(transparent)]
    Env(#[from] EnvError),

    /// An include pattern matched nothing
    #[error("Task '{task}': no files match {pattern}")]
    NoMatches { task: String, pattern: String },

    /// An include pattern is malformed
    #[error("Task '{task}': invalid pattern {pattern}: {message}")]
    InvalidPattern {
        task: String,
        pattern: String,
        message: String,
    },
}

/// What a task has available while it builds its commands
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    /// Name of the running task
    pub task: &'a str,
    /// Shared environment registry
    pub env: &'a EnvironmentRegistry,
    /// Project root
    pub root_dir: &'a Path,
}

impl<'a> TaskContext<'a> {
    /// Create a context
    pub fn new(task: &'a str, env: &'a EnvironmentRegistry, root_dir: &'a Path) -> Self {
        Self {
            task,
            env,
            root_dir,
        }
    }

    /// Resolve a variable the task cannot run without
    pub fn require(&self, name: &str) -> Result<String, TaskError> {
        Ok(self.env.require(name, self.task)?)
    }

    /// Resolve the comma-separated globs in `name` against the project
    /// root. Results are relative to the root, deduplicated, in match order.
    /// Matching nothing is an error.
    pub fn includes(&self, name: &str) -> Result<Vec<PathBuf>, TaskError> {
        let patterns = self.env.resolve_array(name, ",");
        if patterns.is_empty() {
            return Err(EnvError::Missing {
                name: name.to_string(),
                task: Some(self.task.to_string()),
            }
            .into());
        }

        let mut found = Vec::new();
        for pattern in &patterns {
            found.extend(self.glob(pattern)?);
        }

        let mut seen = std::collections::HashSet::new();
        found.retain(|path| seen.insert(path.clone()));

        if found.is_empty() {
            return Err(TaskError::NoMatches {
                task: self.task.to_string(),
                pattern: patterns.join(", "),
            });
        }
        Ok(found)
    }

    /// Expand one glob pattern relative to the project root
    pub fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, TaskError> {
        let root = glob::Pattern::escape(&self.root_dir.to_string_lossy());
        let full = Path::new(&root).join(pattern);
        let paths = glob::glob(&full.to_string_lossy()).map_err(|e| TaskError::InvalidPattern {
            task: self.task.to_string(),
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut matches: Vec<PathBuf> = paths
            .flatten()
            .map(|path| {
                path.strip_prefix(self.root_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or(path)
            })
            .collect();
        matches.sort();
        Ok(matches)
    }
}

/// Builds the commands of a task when it runs
pub type CommandFactory =
    Arc<dyn Fn(&TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> + Send + Sync>;

/// How a task does its work
#[derive(Clone, Default)]
pub enum TaskAction {
    /// Only runs its dependencies
    #[default]
    None,
    /// Shell lines, run in order
    Shell(Vec<String>),
    /// Commands computed from configuration at run time
    Commands(CommandFactory),
}

impl TaskAction {
    /// Produce the commands to spawn
    pub fn commands(&self, ctx: &TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Shell(lines) => Ok(lines.iter().map(CommandSpec::shell).collect()),
            Self::Commands(factory) => factory(ctx),
        }
    }
}

impl fmt::Debug for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Shell(lines) => f.debug_tuple("Shell").field(lines).finish(),
            Self::Commands(_) => write!(f, "Commands(<factory>)"),
        }
    }
}

/// Where a task definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    /// A package.json script
    PackageScript,
    /// Compiled into zarro
    BuiltIn,
    /// A module under local-tasks/
    Local(PathBuf),
    /// A module under override-tasks/
    Override(PathBuf),
    /// A module under external-tasks/*/
    External(PathBuf),
}

impl TaskSource {
    /// Short name of the source kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PackageScript => "npm",
            Self::BuiltIn => "built-in",
            Self::Local(_) => "local",
            Self::Override(_) => "override",
            Self::External(_) => "external",
        }
    }

    /// Module file, for sources loaded from disk
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) | Self::Override(path) | Self::External(path) => Some(path),
            Self::PackageScript | Self::BuiltIn => None,
        }
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{} ({})", self.kind(), path.display()),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Definition of a named task
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    /// Task name (e.g., "build", "test", "pack")
    pub name: String,

    /// Help text
    pub help: Option<String>,

    /// Tasks that must complete first
    pub depends_on: Vec<String>,

    /// Whether dependencies may run concurrently; by default they run in
    /// the order listed
    pub parallel: bool,

    /// What the task runs
    pub action: TaskAction,

    /// Where the definition came from
    pub source: TaskSource,
}

impl TaskDefinition {
    /// Create a new task definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            depends_on: Vec::new(),
            parallel: false,
            action: TaskAction::None,
            source: TaskSource::BuiltIn,
        }
    }

    /// Set the help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add a dependency
    pub fn with_depends_on(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    /// Let dependencies run concurrently
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run a shell line (may be called repeatedly)
    pub fn with_shell(mut self, line: impl Into<String>) -> Self {
        match &mut self.action {
            TaskAction::Shell(lines) => lines.push(line.into()),
            _ => self.action = TaskAction::Shell(vec![line.into()]),
        }
        self
    }

    /// Compute commands at run time
    pub fn with_commands<F>(mut self, factory: F) -> Self
    where
        F: Fn(&TaskContext<'_>) -> Result<Vec<CommandSpec>, TaskError> + Send + Sync + 'static,
    {
        self.action = TaskAction::Commands(Arc::new(factory));
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: TaskSource) -> Self {
        self.source = source;
        self
    }
}
