//! Diagnostic output
//!
//! Informational messages go to stderr and are gated by verbosity; task
//! listings and command output belong to stdout and are written by callers.

use colored::{Color, Colorize};

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Normal = 1,
    Verbose = 2,
}

impl Verbosity {
    /// `--verbose` wins over `--silent`, matching the executor's behaviour
    pub fn from_flags(verbose: bool, silent: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else if silent {
            Verbosity::Silent
        } else {
            Verbosity::Normal
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Logger {
    pub verbosity: Verbosity,
}

impl Logger {
    pub fn new(verbosity: Verbosity) -> Self {
        Logger { verbosity }
    }

    /// Enable or disable color for the whole process.
    ///
    /// A non-empty `NO_COLOR` always disables color.
    pub fn init_color(color: bool) {
        let no_color = std::env::var_os("NO_COLOR").map_or(false, |v| !v.is_empty());
        colored::control::set_override(color && !no_color);
    }

    /// Print a message unless silenced
    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{}", message.color(Color::Green));
        }
    }

    /// Print a hint or notice; shown even in silent mode
    pub fn warn(&self, message: &str) {
        eprintln!("{}", message.color(Color::Yellow));
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{}", message.color(Color::Red));
    }

    /// Print debug message (only in verbose mode)
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{}", message.color(Color::Magenta));
        }
    }

    /// Echo a command before it runs
    pub fn command(&self, task: &str, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{}", format!("task: [{}] {}", task, command).color(Color::Green));
        }
    }

    pub fn task_skip(&self, task: &str, reason: &str) {
        self.info(&format!("task: Task \"{}\" is {}", task, reason));
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}
