//! Command execution
//!
//! This module handles executing shell commands.

use crate::error::{ExecutionError, ExecutionResult};
use std::path::Path;
use std::process::{Command as StdCommand, Output, Stdio};

/// Interpreter every command runs in
const SHELL: &str = "sh";

/// A rendered command ready to run
#[derive(Debug, Clone)]
pub struct ShellCommand<'a> {
    pub command: &'a str,
    pub dir: &'a Path,
    pub env: &'a [(String, String)],
}

impl<'a> ShellCommand<'a> {
    pub fn new(command: &'a str, dir: &'a Path, env: &'a [(String, String)]) -> Self {
        ShellCommand { command, dir, env }
    }

    fn build(&self) -> StdCommand {
        let mut command = StdCommand::new(SHELL);
        command.arg("-c").arg(self.command);
        command.current_dir(self.dir);
        command.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> ExecutionError {
        ExecutionError::Spawn {
            command: self.command.to_string(),
            source,
        }
    }

    fn failed(&self, code: Option<i32>) -> ExecutionError {
        ExecutionError::CommandFailed {
            command: self.command.to_string(),
            code,
        }
    }

    /// Run with inherited stdio
    pub fn run(&self) -> ExecutionResult<()> {
        let status = self
            .build()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| self.spawn_error(e))?;

        if !status.success() {
            return Err(self.failed(status.code()));
        }
        Ok(())
    }

    /// Run with stdout and stderr captured. The captured output is
    /// returned whether or not the command succeeded.
    pub fn run_captured(&self) -> ExecutionResult<(Output, ExecutionResult<()>)> {
        let output = self
            .build()
            .stdin(Stdio::inherit())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        let result = if output.status.success() {
            Ok(())
        } else {
            Err(self.failed(output.status.code()))
        };
        Ok((output, result))
    }

    /// Whether the command exits successfully; output is discarded
    pub fn check(&self) -> ExecutionResult<bool> {
        let status = self
            .build()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| self.spawn_error(e))?;

        Ok(status.success())
    }

    /// Standard output of the command with the trailing newline removed
    pub fn capture_stdout(&self) -> ExecutionResult<String> {
        let output = self
            .build()
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(self.failed(output.status.code()));
        }

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.ends_with('\n') {
            stdout.pop();
            if stdout.ends_with('\r') {
                stdout.pop();
            }
        }
        Ok(stdout)
    }
}
