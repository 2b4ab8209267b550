//! Executor running tasks in local `sh` processes

use crate::error::{ExecutionError, ExecutionResult, InitError, TaskRunError, TaskfileError, TaskfileResult};
use crate::executor::command::ShellCommand;
use crate::executor::output::Output;
use crate::executor::status::{expand_globs, is_up_to_date};
use crate::executor::task::{CompiledTask, Compiler};
use crate::executor::{watch, Executor, ExecutorConfig, TaskFilter};
use crate::logger::{Logger, Verbosity};
use crate::taskfile::{
    apply_dotenv, parse_taskfile_file, read_task_names, resolve_taskfile, validate_taskfile, Call, Cmd,
    SchemaVersion, Taskfile, VariableSet, TASKFILE_NAMES,
};
use crate::templater::Templater;
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

/// Nested `task:` calls deeper than this are treated as an endless loop
pub const MAX_CALL_DEPTH: usize = 100;

/// Interrupts after which the process exits without waiting for tasks
const MAX_INTERRUPTS: usize = 3;

/// Outcome of a dependency, shared by every task that depends on it
type DepSlot = Arc<OnceCell<Result<(), TaskRunError>>>;

const DEFAULT_TASKFILE: &str = r#"version: '3'

vars:
  GREETING: Hello, World!

tasks:
  default:
    cmds:
      - echo "{{ GREETING }}"
    silent: true
"#;

/// Runs task commands through `sh -c` on this machine
pub struct LocalExecutor {
    config: ExecutorConfig,
    logger: Logger,
    templater: Templater,
    taskfile: Taskfile,
    version: Option<SchemaVersion>,
    root_dir: PathBuf,
    output: Output,
    dynamic_cache: Mutex<HashMap<String, String>>,
    /// Dependencies started during this invocation
    completed_deps: Mutex<HashMap<String, DepSlot>>,
    interrupted: Arc<AtomicBool>,
}

impl LocalExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let logger = Logger::new(Verbosity::from_flags(config.verbose, config.silent));
        LocalExecutor {
            logger,
            templater: Templater::new(),
            taskfile: Taskfile::default(),
            version: None,
            root_dir: config.dir.clone(),
            output: Output::Interleaved,
            dynamic_cache: Mutex::new(HashMap::new()),
            completed_deps: Mutex::new(HashMap::new()),
            interrupted: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Directory holding the loaded Taskfile
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Absolute form of `--dir`, with `.` components removed
    fn search_dir(&self) -> TaskfileResult<PathBuf> {
        let dir = if self.config.dir.is_absolute() {
            self.config.dir.clone()
        } else {
            let cwd = std::env::current_dir().map_err(|source| TaskfileError::Read {
                path: self.config.dir.clone(),
                source,
            })?;
            cwd.join(&self.config.dir)
        };
        Ok(dir.components().collect())
    }

    fn taskfile_path(&self) -> TaskfileResult<PathBuf> {
        resolve_taskfile(&self.search_dir()?, self.config.entrypoint.as_deref())
    }

    fn compiler(&self) -> Compiler<'_> {
        Compiler {
            taskfile: &self.taskfile,
            globals: &self.taskfile.vars,
            root_dir: &self.root_dir,
            templater: &self.templater,
            dynamic_cache: &self.dynamic_cache,
        }
    }

    fn check_interrupted(&self) -> ExecutionResult<()> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(ExecutionError::Interrupted);
        }
        Ok(())
    }

    /// Run `calls` once, without watching
    pub(crate) fn run_once(&self, calls: &[Call]) -> ExecutionResult<()> {
        lock(&self.completed_deps).clear();

        for call in calls {
            match self.taskfile.tasks.get(&call.task) {
                None => return Err(ExecutionError::TaskNotFound(call.task.clone())),
                Some(task) if task.internal => return Err(ExecutionError::InternalTask(call.task.clone())),
                Some(_) => {}
            }
        }

        if self.config.summary {
            for (i, call) in calls.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print!("{}", self.compiler().compile(call)?.summary_text());
            }
            return Ok(());
        }

        if self.config.parallel && calls.len() > 1 {
            self.run_parallel(calls)
        } else {
            calls.iter().try_for_each(|call| self.run_call(call, 0))
        }
    }

    fn run_parallel(&self, calls: &[Call]) -> ExecutionResult<()> {
        let batch_size = match self.config.concurrency {
            0 => calls.len(),
            n => n,
        };

        for batch in calls.chunks(batch_size) {
            let results: Vec<ExecutionResult<()>> = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|call| scope.spawn(move || self.run_call(call, 0)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                    .collect()
            });
            results.into_iter().collect::<ExecutionResult<Vec<()>>>()?;
        }
        Ok(())
    }

    fn run_call(&self, call: &Call, depth: usize) -> ExecutionResult<()> {
        if depth > MAX_CALL_DEPTH {
            return Err(ExecutionError::CallDepthExceeded(call.task.clone()));
        }
        self.check_interrupted()?;

        let task = self.compiler().compile(call)?;
        self.logger.debug(&format!("task: \"{}\" started", task.name));

        for dep in &task.deps {
            self.run_dep(dep, depth + 1)?;
        }

        if !self.config.force && is_up_to_date(&task)? {
            self.logger.task_skip(&task.name, "up to date");
            return Ok(());
        }

        self.run_cmds(&task, depth).map_err(|e| match e {
            ExecutionError::TaskRun(_) | ExecutionError::Interrupted => e,
            other => TaskRunError::new(&task.name, &other).into(),
        })?;

        self.logger.debug(&format!("task: \"{}\" finished", task.name));
        Ok(())
    }

    /// Run `dep` once per invocation. Concurrent callers block until the
    /// first run finishes and share its outcome.
    fn run_dep(&self, dep: &Call, depth: usize) -> ExecutionResult<()> {
        let slot = Arc::clone(lock(&self.completed_deps).entry(call_key(dep)).or_default());

        let mut failure = None;
        let outcome = slot.get_or_init(|| {
            self.run_call(dep, depth).map_err(|e| {
                let shared = match &e {
                    ExecutionError::TaskRun(run) => run.clone(),
                    other => TaskRunError::new(&dep.task, other),
                };
                failure = Some(e);
                shared
            })
        });

        match (failure, outcome) {
            (Some(e), _) => Err(e),
            (None, Ok(())) => Ok(()),
            (None, Err(e)) => Err(e.clone().into()),
        }
    }

    fn run_cmds(&self, task: &CompiledTask, depth: usize) -> ExecutionResult<()> {
        for cmd in &task.cmds {
            self.check_interrupted()?;
            match cmd {
                Cmd::Command {
                    cmd,
                    silent,
                    ignore_error,
                } => self.run_command(task, cmd, *silent, *ignore_error)?,
                Cmd::Task(call) => self.run_call(call, depth + 1)?,
            }
        }
        Ok(())
    }

    fn run_command(&self, task: &CompiledTask, cmd: &str, silent: bool, ignore_error: bool) -> ExecutionResult<()> {
        if self.logger.is_verbose() || !(silent || task.silent) {
            self.logger.command(&task.name, cmd);
        }
        if self.config.dry {
            return Ok(());
        }

        let shell = ShellCommand::new(cmd, &task.dir, &task.env);
        let result = if self.output.captures() {
            let (captured, result) = shell.run_captured()?;
            self.output
                .emit(&task.name, &captured, &self.templater, &task.vars)?;
            result
        } else {
            shell.run()
        };

        match result {
            Err(e) if ignore_error || task.ignore_error => {
                self.logger
                    .warn(&format!("task: [{}] command error ignored: {}", task.name, e));
                Ok(())
            }
            other => other,
        }
    }

    /// Source files of `calls`, their dependencies and nested calls
    pub(crate) fn watched_files(&self, calls: &[Call]) -> ExecutionResult<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut pending: Vec<(Call, usize)> = calls.iter().map(|c| (c.clone(), 0)).collect();

        while let Some((call, depth)) = pending.pop() {
            if depth > MAX_CALL_DEPTH || !seen.insert(call_key(&call)) {
                continue;
            }
            let task = self.compiler().compile(&call)?;
            files.extend(expand_globs(&task.dir, &task.sources)?);

            pending.extend(task.deps.iter().map(|d| (d.clone(), depth + 1)));
            for cmd in &task.cmds {
                if let Cmd::Task(nested) = cmd {
                    pending.push((nested.clone(), depth + 1));
                }
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }
}

impl Executor for LocalExecutor {
    fn setup(&mut self) -> TaskfileResult<()> {
        let path = self.taskfile_path()?;
        let mut taskfile = parse_taskfile_file(&path)?;
        let version = validate_taskfile(&taskfile)?;

        self.root_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        apply_dotenv(&mut taskfile, &self.root_dir)?;

        self.output = Output::resolve(&self.config.output, taskfile.output.as_ref());
        self.logger
            .debug(&format!("task: using {} (schema {})", path.display(), version));
        self.taskfile = taskfile;
        self.version = Some(version);
        Ok(())
    }

    fn parsed_version(&self) -> TaskfileResult<SchemaVersion> {
        match self.version {
            Some(version) => Ok(version),
            None => SchemaVersion::from_yaml(self.taskfile.version.as_ref()),
        }
    }

    fn vars_mut(&mut self) -> &mut VariableSet {
        &mut self.taskfile.vars
    }

    fn list_task_names(&self, include_desc_less: bool) -> TaskfileResult<bool> {
        let names = read_task_names(&self.taskfile_path()?)?;
        let mut printed = false;
        for task in names {
            if !task.internal && (include_desc_less || task.has_desc) {
                println!("{}", task.name);
                printed = true;
            }
        }
        Ok(printed)
    }

    fn list_tasks(&self, filters: &[TaskFilter]) -> bool {
        let tasks: Vec<_> = self
            .taskfile
            .tasks
            .iter()
            .filter(|(_, task)| filters.iter().all(|f| f.keeps(task)))
            .collect();
        if tasks.is_empty() {
            return false;
        }

        let width = tasks.iter().map(|(name, _)| name.len() + 1).max().unwrap_or(0);
        println!("task: Available tasks for this project:");
        for (name, task) in tasks {
            let label = format!("{}:", name);
            let desc = task.desc.as_deref().unwrap_or("").trim();
            println!("* {:<width$} {}", label, desc, width = width);
        }
        true
    }

    fn status(&self, calls: &[Call]) -> ExecutionResult<()> {
        for call in calls {
            let task = self.compiler().compile(call)?;
            if !is_up_to_date(&task)? {
                return Err(ExecutionError::NotUpToDate(task.name));
            }
        }
        Ok(())
    }

    fn run(&self, calls: &[Call]) -> ExecutionResult<()> {
        if self.config.watch {
            let interval = watch::parse_interval(&self.config.interval)?;
            return watch::watch(self, calls, interval);
        }
        self.run_once(calls)
    }

    fn init_taskfile(&self, out: &mut dyn Write, dir: &Path) -> Result<(), InitError> {
        for name in TASKFILE_NAMES {
            let existing = dir.join(name);
            if existing.exists() {
                return Err(InitError::AlreadyExists(existing));
            }
        }

        let path = dir.join(TASKFILE_NAMES[0]);
        fs::write(&path, DEFAULT_TASKFILE).map_err(|source| InitError::Write {
            path: path.clone(),
            source,
        })?;
        writeln!(out, "{} created in the current directory", TASKFILE_NAMES[0])
            .map_err(|source| InitError::Write { path, source })
    }

    fn intercept_interrupt_signals(&self) {
        let interrupted = Arc::clone(&self.interrupted);
        let received = AtomicUsize::new(0);

        let installed = ctrlc::set_handler(move || {
            let count = received.fetch_add(1, Ordering::SeqCst) + 1;
            interrupted.store(true, Ordering::SeqCst);
            if count >= MAX_INTERRUPTS {
                eprintln!("task: Received {} interrupt signals, force exiting", count);
                std::process::exit(1);
            }
            eprintln!("task: Signal received: interrupt");
        });

        if let Err(e) = installed {
            self.logger
                .warn(&format!("task: could not install interrupt handler: {}", e));
        }
    }
}

/// Identity of a call for "run once" bookkeeping
fn call_key(call: &Call) -> String {
    let mut key = call.task.clone();
    for (name, var) in call.vars.iter() {
        key.push_str(&format!("\0{}={:?}", name, var));
    }
    key
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
