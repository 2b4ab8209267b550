//! Main CLI application
//!
//! Decodes the command line, picks exactly one top-level action and drives
//! the executor. Errors are turned into a diagnostic and an exit code here
//! and nowhere else.

use crate::cli::args::{build_calls, set_cli_args, split_args};
use crate::cli::flags::{parse_flags, Invocation, Options};
use crate::error::{CliError, Result};
use crate::executor::{Executor, ExecutorConfig, LocalExecutor, TaskFilter};
use crate::logger::Logger;
use std::ffi::OsString;
use std::io::{self, Write};

const NO_TASKS: &str = "task: No tasks available";
const NO_DESCRIBED_TASKS: &str = "task: No tasks with description available. Try --list-all to list all tasks";

/// Run the command line with the process arguments and the local executor.
/// Returns the process exit code.
pub fn run() -> i32 {
    match collect_args(std::env::args_os()) {
        Ok(argv) => run_with(argv, LocalExecutor::new),
        Err(e) => report(&e, false),
    }
}

/// Run the command line with `argv`, creating the executor from the
/// decoded settings
pub fn run_with<E, F>(argv: Vec<String>, make_executor: F) -> i32
where
    E: Executor,
    F: FnOnce(ExecutorConfig) -> E,
{
    let invocation = match parse_flags(argv) {
        Ok(invocation) => invocation,
        Err(e) => return report(&e, false),
    };

    let (options, positionals, dash_pos) = match invocation {
        Invocation::Info(text) => {
            print!("{}", text);
            return 0;
        }
        Invocation::Run {
            options,
            positionals,
            dash_pos,
        } => (options, positionals, dash_pos),
    };

    Logger::init_color(options.color);
    let mut executor = make_executor(options.executor_config());
    let mut stdout = io::stdout();

    match dispatch(&options, &positionals, dash_pos, &mut executor, &mut stdout) {
        Ok(()) => 0,
        Err(e) => report(&e, options.exit_code),
    }
}

/// Arguments as UTF-8 strings
fn collect_args<I: IntoIterator<Item = OsString>>(args: I) -> Result<Vec<String>> {
    args.into_iter()
        .map(|arg| {
            arg.into_string().map_err(|arg| CliError::ArgumentEncoding {
                arg: arg.to_string_lossy().into_owned(),
                reason: "not valid UTF-8".to_string(),
            })
        })
        .collect()
}

fn report(err: &CliError, exit_code_requested: bool) -> i32 {
    match err {
        CliError::Usage(e) => {
            if let Err(write_err) = write_usage(e, &mut io::stderr()) {
                Logger::default().error(&format!("task: cannot print usage: {}", write_err));
            }
        }
        other => Logger::default().error(&other.to_string()),
    }
    err.exit_code(exit_code_requested)
}

fn write_usage(err: &clap::Error, out: &mut dyn Write) -> io::Result<()> {
    write!(out, "{}", err.render())?;
    out.flush()
}

/// Perform the single action selected by `options`
pub(crate) fn dispatch<E: Executor>(
    options: &Options,
    positionals: &[String],
    dash_pos: Option<usize>,
    executor: &mut E,
    out: &mut dyn Write,
) -> Result<()> {
    if options.init {
        let cwd = std::env::current_dir()?;
        executor.init_taskfile(out, &cwd)?;
        return Ok(());
    }

    if (options.list || options.list_all) && options.silent {
        if !executor.list_task_names(options.list_all)? {
            writeln!(out, "{}", NO_TASKS)?;
        }
        return Ok(());
    }

    executor.setup()?;
    let version = executor.parsed_version()?;

    if options.list {
        if !executor.list_tasks(&[TaskFilter::OutInternal, TaskFilter::OutNoDesc]) {
            writeln!(out, "{}", NO_DESCRIBED_TASKS)?;
        }
        return Ok(());
    }

    if options.list_all {
        if !executor.list_tasks(&[TaskFilter::OutInternal]) {
            writeln!(out, "{}", NO_TASKS)?;
        }
        return Ok(());
    }

    let (tokens, cli_args) = split_args(positionals, dash_pos)?;
    let (calls, mut globals) = build_calls(&tokens, version)?;
    set_cli_args(&mut globals, &cli_args);
    executor.vars_mut().override_with(&globals);

    if options.status {
        return executor.status(&calls).map_err(CliError::Status);
    }

    if !options.watch {
        executor.intercept_interrupt_signals();
    }
    executor.run(&calls).map_err(CliError::Run)
}
