//! Output styles for task commands

use crate::error::ExecutionResult;
use crate::taskfile::{GroupTemplates, OutputConfig, OutputStyle};
use crate::templater::{TemplateVars, Templater};
use std::io::{self, Write};
use std::process::Output as ProcessOutput;

/// Resolved output style of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Interleaved,
    Group(GroupTemplates),
    Prefixed,
}

impl Output {
    /// Command line settings win over the Taskfile's; interleaved otherwise
    pub fn resolve(cli: &OutputConfig, taskfile: Option<&OutputConfig>) -> Self {
        let config = if cli.is_set() {
            cli
        } else {
            match taskfile {
                Some(config) if config.is_set() => config,
                _ => return Output::Interleaved,
            }
        };

        match config.style {
            Some(OutputStyle::Group) => Output::Group(config.group.clone()),
            Some(OutputStyle::Prefixed) => Output::Prefixed,
            Some(OutputStyle::Interleaved) | None => Output::Interleaved,
        }
    }

    /// Whether commands must run with captured output
    pub fn captures(&self) -> bool {
        !matches!(self, Output::Interleaved)
    }

    /// Write captured output of one command of `task`
    pub fn emit(
        &self,
        task: &str,
        captured: &ProcessOutput,
        templater: &Templater,
        vars: &TemplateVars,
    ) -> ExecutionResult<()> {
        let stdout = String::from_utf8_lossy(&captured.stdout);
        let stderr = String::from_utf8_lossy(&captured.stderr);

        match self {
            Output::Interleaved => {
                write_all(&mut io::stdout().lock(), &stdout)?;
                write_all(&mut io::stderr().lock(), &stderr)?;
            }
            Output::Group(templates) => {
                let mut out = io::stdout().lock();
                if !templates.begin.is_empty() {
                    writeln!(out, "{}", templater.render(&templates.begin, vars)?)?;
                }
                write_all(&mut out, &stdout)?;
                write_all(&mut io::stderr().lock(), &stderr)?;
                if !templates.end.is_empty() {
                    writeln!(out, "{}", templater.render(&templates.end, vars)?)?;
                }
            }
            Output::Prefixed => {
                write_all(&mut io::stdout().lock(), &prefix_lines(task, &stdout))?;
                write_all(&mut io::stderr().lock(), &prefix_lines(task, &stderr))?;
            }
        }
        Ok(())
    }
}

/// Prefix every line of `text` with `[task] `
pub fn prefix_lines(task: &str, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        out.push_str(&format!("[{}] {}\n", task, line));
    }
    out
}

fn write_all(w: &mut impl Write, text: &str) -> io::Result<()> {
    w.write_all(text.as_bytes())?;
    w.flush()
}
