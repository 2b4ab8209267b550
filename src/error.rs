//! Error types for taskr

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for command line operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code used for every failure that has no more specific code
pub const EXIT_FAILURE: i32 = 1;

/// Top-level error for a single invocation of the command line
#[derive(Error, Debug)]
pub enum CliError {
    /// Unknown flag or malformed flag value; carries the rendered usage
    #[error("{0}")]
    Usage(#[from] clap::Error),

    /// Two flags that cannot be combined were both given
    #[error("task: {0}")]
    InvalidFlagCombination(String),

    /// A pass-through argument could not be quoted for the shell
    #[error("task: cannot quote argument {arg:?}: {reason}")]
    ArgumentEncoding { arg: String, reason: String },

    /// Task names and variable assignments could not be interpreted
    #[error("task: {0}")]
    MalformedArguments(String),

    /// The Taskfile is missing or invalid
    #[error("task: {0}")]
    TaskfileLoad(#[from] TaskfileError),

    /// The Taskfile could not be scaffolded
    #[error("task: {0}")]
    Init(#[from] InitError),

    /// A `--status` check found a task that is not up to date
    #[error("task: {0}")]
    Status(ExecutionError),

    /// Running a task failed
    #[error("task: {0}")]
    Run(ExecutionError),

    /// I/O errors
    #[error("task: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// With `exit_code_requested` (the `-x` flag) a failed task command
    /// propagates its own exit status; everything else exits with 1, except
    /// usage errors which keep clap's code.
    pub fn exit_code(&self, exit_code_requested: bool) -> i32 {
        match self {
            CliError::Usage(e) => e.exit_code(),
            CliError::Run(ExecutionError::TaskRun(e)) if exit_code_requested => {
                e.exit_code().unwrap_or(EXIT_FAILURE)
            }
            _ => EXIT_FAILURE,
        }
    }
}

/// Taskfile discovery, parsing and validation errors
#[derive(Error, Debug)]
pub enum TaskfileError {
    #[error("No Taskfile found (searched: {0})")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Taskfile option \"version\" is required")]
    MissingVersion,

    #[error("Could not parse Taskfile version {0:?}")]
    InvalidVersion(String),

    #[error("Taskfile versions prior to v2 are not supported (found {0})")]
    UnsupportedVersion(String),

    #[error("Task \"{task}\" referenced by \"{referenced_by}\" does not exist")]
    UnknownReference { task: String, referenced_by: String },

    #[error("Cyclic dependency detected: {0}")]
    CyclicDependency(String),

    #[error("Failed to load dotenv file {path}: {reason}")]
    Dotenv { path: PathBuf, reason: String },
}

/// Errors from scaffolding a new Taskfile
#[derive(Error, Debug)]
pub enum InitError {
    #[error("A Taskfile already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Task \"{0}\" does not exist")]
    TaskNotFound(String),

    #[error("Task \"{0}\" is internal and cannot be called from the command line")]
    InternalTask(String),

    #[error("command {command:?} exited with {}", describe_code(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to render template {template:?}: {reason}")]
    Template { template: String, reason: String },

    #[error("failed to evaluate dynamic variable \"{name}\": {reason}")]
    DynamicVar { name: String, reason: String },

    #[error("invalid glob pattern {pattern:?}: {reason}")]
    Glob { pattern: String, reason: String },

    #[error("invalid interval {0:?}: expected a duration such as 500ms, 5s or 1m30s")]
    InvalidInterval(String),

    #[error("maximum task call depth exceeded while calling \"{0}\"; is there an infinite call loop?")]
    CallDepthExceeded(String),

    #[error("Task \"{0}\" is not up-to-date")]
    NotUpToDate(String),

    #[error("task run interrupted")]
    Interrupted,

    #[error(transparent)]
    TaskRun(#[from] TaskRunError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExecutionError {
    /// The process exit status carried by this error, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::CommandFailed { code, .. } => *code,
            ExecutionError::TaskRun(e) => e.exit_code(),
            _ => None,
        }
    }
}

/// A task invocation failed
#[derive(Error, Debug, Clone)]
#[error("Failed to run task \"{task}\": {reason}")]
pub struct TaskRunError {
    pub task: String,
    pub reason: String,
    code: Option<i32>,
}

impl TaskRunError {
    /// Wrap the error that made `task` fail, keeping its exit status
    pub fn new(task: impl Into<String>, err: &ExecutionError) -> Self {
        TaskRunError {
            task: task.into(),
            reason: err.to_string(),
            code: err.exit_code(),
        }
    }

    /// Exit status of the failing command, when it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        self.code
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

/// Specialized result type for Taskfile operations
pub type TaskfileResult<T> = std::result::Result<T, TaskfileError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
