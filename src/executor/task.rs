//! Compiling a call into a runnable task
//!
//! Compilation resolves variables, renders every templated field and fixes
//! the working directory, producing a [`CompiledTask`] that can be checked
//! and executed without going back to the Taskfile.

use crate::error::{ExecutionError, ExecutionResult};
use crate::executor::command::ShellCommand;
use crate::taskfile::{Call, Cmd, Taskfile, Var, VariableSet};
use crate::templater::{TemplateVars, Templater};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Runtime task representation with every template rendered
#[derive(Debug, Clone, Default)]
pub struct CompiledTask {
    pub name: String,
    pub desc: Option<String>,
    pub summary: Option<String>,
    /// Absolute working directory
    pub dir: PathBuf,
    /// Resolved variables, used for output templates
    pub vars: TemplateVars,
    /// Environment passed to commands
    pub env: Vec<(String, String)>,
    pub deps: Vec<Call>,
    pub cmds: Vec<Cmd>,
    pub status: Vec<String>,
    pub sources: Vec<String>,
    pub generates: Vec<String>,
    pub silent: bool,
    pub ignore_error: bool,
}

impl CompiledTask {
    /// Text printed by `--summary`
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "task: {}", self.name);
        let _ = writeln!(out);

        match (self.summary.as_deref(), self.desc.as_deref()) {
            (Some(summary), _) if !summary.trim().is_empty() => {
                let _ = writeln!(out, "{}", summary.trim_end());
            }
            (_, Some(desc)) if !desc.trim().is_empty() => {
                let _ = writeln!(out, "{}", desc.trim_end());
            }
            _ => {
                let _ = writeln!(out, "(task does not have description or summary)");
            }
        }

        if !self.deps.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "dependencies:");
            for dep in &self.deps {
                let _ = writeln!(out, " - {}", dep.task);
            }
        }

        if !self.cmds.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "commands:");
            for cmd in &self.cmds {
                match cmd {
                    Cmd::Command { cmd, .. } => {
                        let _ = writeln!(out, " - {}", cmd);
                    }
                    Cmd::Task(call) => {
                        let _ = writeln!(out, " - Task: {}", call.task);
                    }
                }
            }
        }
        out
    }
}

/// Turns calls into compiled tasks
pub struct Compiler<'a> {
    pub taskfile: &'a Taskfile,
    /// Taskfile vars with command line globals applied
    pub globals: &'a VariableSet,
    pub root_dir: &'a Path,
    pub templater: &'a Templater,
    /// Output of dynamic variables, keyed by rendered command
    pub dynamic_cache: &'a Mutex<HashMap<String, String>>,
}

impl<'a> Compiler<'a> {
    /// Compile `call`.
    ///
    /// Variables resolve in the order Taskfile globals, task vars, call
    /// vars; a later layer overrides an earlier one and may reference it.
    pub fn compile(&self, call: &Call) -> ExecutionResult<CompiledTask> {
        let task = self
            .taskfile
            .tasks
            .get(&call.task)
            .ok_or_else(|| ExecutionError::TaskNotFound(call.task.clone()))?;

        let mut vars = TemplateVars::new();
        vars.insert("TASK".to_string(), call.task.clone());
        vars.insert(
            "ROOT_DIR".to_string(),
            self.root_dir.to_string_lossy().into_owned(),
        );

        for layer in [self.globals, &task.vars, &call.vars] {
            self.resolve_into(layer, &mut vars)?;
        }

        let mut env = TemplateVars::new();
        for layer in [&self.taskfile.env, &task.env] {
            for (name, var) in layer.iter() {
                let value = self.resolve_var(name, var, &vars)?;
                env.insert(name.to_string(), value);
            }
        }

        let dir = match &task.dir {
            Some(dir) => {
                let rendered = self.templater.render(dir, &vars)?;
                let path = PathBuf::from(rendered);
                if path.is_absolute() {
                    path
                } else {
                    self.root_dir.join(path)
                }
            }
            None => self.root_dir.to_path_buf(),
        };

        let cmds = task
            .cmds
            .iter()
            .map(|cmd| match cmd {
                Cmd::Command {
                    cmd,
                    silent,
                    ignore_error,
                } => Ok(Cmd::Command {
                    cmd: self.templater.render(cmd, &vars)?,
                    silent: *silent,
                    ignore_error: *ignore_error,
                }),
                Cmd::Task(call) => Ok(Cmd::Task(self.render_call(call, &vars)?)),
            })
            .collect::<ExecutionResult<Vec<_>>>()?;

        let deps = task
            .deps
            .iter()
            .map(|dep| self.render_call(dep, &vars))
            .collect::<ExecutionResult<Vec<_>>>()?;

        Ok(CompiledTask {
            name: call.task.clone(),
            desc: task.desc.clone(),
            summary: task.summary.clone(),
            dir,
            env: env.into_iter().collect(),
            deps,
            cmds,
            status: self.templater.render_list(&task.status, &vars)?,
            sources: self.templater.render_list(&task.sources, &vars)?,
            generates: self.templater.render_list(&task.generates, &vars)?,
            silent: task.silent,
            ignore_error: task.ignore_error,
            vars,
        })
    }

    /// Resolve `layer` into `target`; each value renders against what
    /// `target` already holds
    fn resolve_into(&self, layer: &VariableSet, target: &mut TemplateVars) -> ExecutionResult<()> {
        for (name, var) in layer.iter() {
            let value = self.resolve_var(name, var, target)?;
            target.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn resolve_var(&self, name: &str, var: &Var, scope: &TemplateVars) -> ExecutionResult<String> {
        match var {
            Var::Static(value) => self.templater.render(value, scope),
            Var::Literal(value) => Ok(value.clone()),
            Var::Dynamic { sh } => {
                let command = self.templater.render(sh, scope)?;
                self.evaluate_dynamic(name, &command)
            }
        }
    }

    fn evaluate_dynamic(&self, name: &str, command: &str) -> ExecutionResult<String> {
        if let Some(cached) = self.lock_cache().get(command) {
            return Ok(cached.clone());
        }

        let value = ShellCommand::new(command, self.root_dir, &[])
            .capture_stdout()
            .map_err(|e| ExecutionError::DynamicVar {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        self.lock_cache().insert(command.to_string(), value.clone());
        Ok(value)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned cache only means another thread panicked mid-insert
        self.dynamic_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Render the static variable values of a nested call; rendered values
    /// are not rendered again when the callee compiles
    fn render_call(&self, call: &Call, vars: &TemplateVars) -> ExecutionResult<Call> {
        let mut rendered = VariableSet::new();
        for (name, var) in call.vars.iter() {
            let var = match var {
                Var::Static(value) => Var::Literal(self.templater.render(value, vars)?),
                other => other.clone(),
            };
            rendered.set(name, var);
        }
        Ok(Call::new(call.task.clone()).with_vars(rendered))
    }
}
