//! Taskfile validation
//!
//! This module checks a parsed Taskfile before anything is executed.

use crate::error::{TaskfileError, TaskfileResult};
use crate::taskfile::types::{Cmd, Task, Taskfile};
use crate::taskfile::version::SchemaVersion;
use std::collections::HashSet;

/// Validate a complete Taskfile, returning its schema version
pub fn validate_taskfile(taskfile: &Taskfile) -> TaskfileResult<SchemaVersion> {
    let version = SchemaVersion::from_yaml(taskfile.version.as_ref())?;

    for (name, task) in &taskfile.tasks {
        validate_task(taskfile, name, task)?;
    }

    detect_cycles(taskfile)?;

    Ok(version)
}

/// Every dependency and task call must name an existing task
fn validate_task(taskfile: &Taskfile, name: &str, task: &Task) -> TaskfileResult<()> {
    for callee in called_tasks(task) {
        if !taskfile.tasks.contains_key(callee) {
            return Err(TaskfileError::UnknownReference {
                task: callee.to_string(),
                referenced_by: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Names of tasks a task depends on or calls, deps first
fn called_tasks(task: &Task) -> impl Iterator<Item = &str> {
    let deps = task.deps.iter().map(|call| call.task.as_str());
    let calls = task.cmds.iter().filter_map(|cmd| match cmd {
        Cmd::Task(call) => Some(call.task.as_str()),
        Cmd::Command { .. } => None,
    });
    deps.chain(calls)
}

fn detect_cycles(taskfile: &Taskfile) -> TaskfileResult<()> {
    let mut visited = HashSet::new();
    for name in taskfile.tasks.keys() {
        let mut stack = Vec::new();
        check_task_cycle(taskfile, name, &mut visited, &mut stack)?;
    }
    Ok(())
}

/// Depth-first walk that reports the first cycle found
fn check_task_cycle<'a>(
    taskfile: &'a Taskfile,
    task_name: &'a str,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
) -> TaskfileResult<()> {
    if stack.contains(&task_name) {
        stack.push(task_name);
        return Err(TaskfileError::CyclicDependency(stack.join(" -> ")));
    }

    if visited.contains(task_name) {
        return Ok(());
    }

    // Unknown names were already reported by validate_task
    let Some(task) = taskfile.tasks.get(task_name) else {
        return Ok(());
    };

    stack.push(task_name);
    for callee in called_tasks(task) {
        check_task_cycle(taskfile, callee, visited, stack)?;
    }
    stack.pop();
    visited.insert(task_name);

    Ok(())
}
