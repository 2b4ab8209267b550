//! Up-to-date checks

use crate::error::{ExecutionError, ExecutionResult};
use crate::executor::command::ShellCommand;
use crate::executor::task::CompiledTask;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Whether `task` can be skipped.
///
/// A task is up to date when all of its `status` commands succeed and, if it
/// declares both `sources` and `generates`, no source file is newer than the
/// oldest generated file. A task with neither check is never up to date.
pub fn is_up_to_date(task: &CompiledTask) -> ExecutionResult<bool> {
    let has_timestamps = !task.sources.is_empty() && !task.generates.is_empty();
    if task.status.is_empty() && !has_timestamps {
        return Ok(false);
    }

    for status in &task.status {
        if !ShellCommand::new(status, &task.dir, &task.env).check()? {
            return Ok(false);
        }
    }

    if has_timestamps {
        return generates_are_fresh(&task.dir, &task.sources, &task.generates);
    }

    Ok(true)
}

/// Newest source is not newer than the oldest generated file
fn generates_are_fresh(dir: &Path, sources: &[String], generates: &[String]) -> ExecutionResult<bool> {
    let generated = expand_globs(dir, generates)?;
    if generated.is_empty() {
        return Ok(false);
    }

    let oldest_generated = match generated.iter().map(|p| modified(p)).min() {
        Some(Some(time)) => time,
        _ => return Ok(false),
    };

    let newest_source = expand_globs(dir, sources)?
        .iter()
        .filter_map(|p| modified(p))
        .max();

    Ok(match newest_source {
        Some(newest) => newest <= oldest_generated,
        None => true,
    })
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Files matching `patterns`, relative patterns resolved against `dir`
pub fn expand_globs(dir: &Path, patterns: &[String]) -> ExecutionResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            dir.join(pattern)
        };
        let full = full.to_string_lossy().into_owned();

        let paths = glob::glob(&full).map_err(|e| ExecutionError::Glob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        for entry in paths.flatten() {
            if entry.is_file() {
                files.push(entry);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
