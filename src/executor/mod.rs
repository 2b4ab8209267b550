//! Task execution
//!
//! The command line drives task execution through the [`Executor`] trait.
//! [`LocalExecutor`] implements it by running task commands in `sh`.

pub mod command;
pub mod local;
pub mod output;
pub mod status;
pub mod task;
pub mod watch;

pub use local::LocalExecutor;

use crate::error::{ExecutionResult, InitError, TaskfileResult};
use crate::taskfile::{Call, OutputConfig, SchemaVersion, Task, VariableSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Settings the command line hands to the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub force: bool,
    pub watch: bool,
    pub verbose: bool,
    pub silent: bool,
    pub dry: bool,
    pub summary: bool,
    pub parallel: bool,
    pub color: bool,
    /// Maximum number of calls run at once; 0 means unlimited
    pub concurrency: usize,
    /// Watch polling interval, e.g. `5s`
    pub interval: String,
    /// Directory the Taskfile is searched from
    pub dir: PathBuf,
    /// Taskfile name inside `dir`; searched for when unset
    pub entrypoint: Option<PathBuf>,
    pub output: OutputConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            force: false,
            watch: false,
            verbose: false,
            silent: false,
            dry: false,
            summary: false,
            parallel: false,
            color: true,
            concurrency: 0,
            interval: "5s".to_string(),
            dir: PathBuf::from("."),
            entrypoint: None,
            output: OutputConfig::default(),
        }
    }
}

/// Filters applied when listing tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    /// Hide tasks marked `internal`
    OutInternal,
    /// Hide tasks without a description
    OutNoDesc,
}

impl TaskFilter {
    pub fn keeps(&self, task: &Task) -> bool {
        match self {
            TaskFilter::OutInternal => !task.internal,
            TaskFilter::OutNoDesc => task.has_description(),
        }
    }
}

/// Operations the command line needs from a task executor
pub trait Executor {
    /// Load and validate the Taskfile
    fn setup(&mut self) -> TaskfileResult<()>;

    /// Schema version of the loaded Taskfile
    fn parsed_version(&self) -> TaskfileResult<SchemaVersion>;

    /// Global variable table of the loaded Taskfile
    fn vars_mut(&mut self) -> &mut VariableSet;

    /// Print task names only, one per line, reading the Taskfile without
    /// validating it. Returns whether any name was printed.
    fn list_task_names(&self, include_desc_less: bool) -> TaskfileResult<bool>;

    /// Print tasks with their descriptions. Returns whether any task
    /// passed the filters.
    fn list_tasks(&self, filters: &[TaskFilter]) -> bool;

    /// Fail unless every call is up to date; runs nothing
    fn status(&self, calls: &[Call]) -> ExecutionResult<()>;

    /// Execute the calls
    fn run(&self, calls: &[Call]) -> ExecutionResult<()>;

    /// Write a starter Taskfile into `dir`, reporting to `out`
    fn init_taskfile(&self, out: &mut dyn Write, dir: &Path) -> Result<(), InitError>;

    /// Install interrupt handling for a non-watch run
    fn intercept_interrupt_signals(&self);
}
