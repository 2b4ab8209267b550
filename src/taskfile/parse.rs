//! Taskfile discovery and parsing

use crate::error::{TaskfileError, TaskfileResult};
use crate::taskfile::types::Taskfile;
use crate::taskfile::vars::{Var, VariableSet};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Taskfile names searched for, in order of preference
pub const TASKFILE_NAMES: &[&str] = &["Taskfile.yml", "Taskfile.yaml", "taskfile.yml", "taskfile.yaml"];

/// Find the Taskfile by searching `start_dir` and its parents
pub fn find_taskfile_from(start_dir: &Path) -> TaskfileResult<PathBuf> {
    let mut current_dir = start_dir.to_path_buf();
    let mut searched_paths = Vec::new();

    loop {
        for file_name in TASKFILE_NAMES {
            let path = current_dir.join(file_name);
            searched_paths.push(path.display().to_string());

            if path.is_file() {
                return Ok(path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(TaskfileError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Resolve the Taskfile path from the `--dir` / `--taskfile` settings.
///
/// An explicit entrypoint must exist inside `dir`; otherwise the usual
/// names are searched from `dir` upwards.
pub fn resolve_taskfile(dir: &Path, entrypoint: Option<&Path>) -> TaskfileResult<PathBuf> {
    match entrypoint {
        Some(entrypoint) => {
            let path = dir.join(entrypoint);
            if path.is_file() {
                Ok(path)
            } else {
                Err(TaskfileError::NotFound(path.display().to_string()))
            }
        }
        None => find_taskfile_from(dir),
    }
}

/// Parse a Taskfile from a path
pub fn parse_taskfile_file(path: &Path) -> TaskfileResult<Taskfile> {
    let contents = read(path)?;
    parse_taskfile(&contents, path)
}

/// Parse a Taskfile from a string; `path` is used for error messages
pub fn parse_taskfile(yaml: &str, path: &Path) -> TaskfileResult<Taskfile> {
    serde_yaml::from_str(yaml).map_err(|source| TaskfileError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// A task as seen by the name-only listing
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskName {
    pub name: String,
    pub has_desc: bool,
    pub internal: bool,
}

/// Task names with their description and `internal` flags, read without
/// deserializing or validating task bodies
pub fn read_task_names(path: &Path) -> TaskfileResult<Vec<TaskName>> {
    let contents = read(path)?;
    let doc: Value = serde_yaml::from_str(&contents).map_err(|source| TaskfileError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    if let Some(Value::Mapping(tasks)) = doc.get("tasks") {
        for (name, body) in tasks {
            if let Some(name) = name.as_str() {
                let has_desc = body
                    .get("desc")
                    .and_then(Value::as_str)
                    .map_or(false, |d| !d.trim().is_empty());
                let internal = body.get("internal").and_then(Value::as_bool).unwrap_or(false);
                names.push(TaskName {
                    name: name.to_string(),
                    has_desc,
                    internal,
                });
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Read the Taskfile's dotenv files into its global environment.
///
/// Values already present in `env:` win over dotenv values; earlier files
/// win over later ones. Missing files are skipped.
pub fn apply_dotenv(taskfile: &mut Taskfile, base_dir: &Path) -> TaskfileResult<()> {
    for file in taskfile.dotenv.clone() {
        let path = base_dir.join(&file);
        if !path.is_file() {
            continue;
        }

        let iter = dotenvy::from_path_iter(&path).map_err(|e| TaskfileError::Dotenv {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let mut loaded = VariableSet::new();
        for item in iter {
            let (key, value) = item.map_err(|e| TaskfileError::Dotenv {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            loaded.set(key, Var::Static(value));
        }
        taskfile.env.merge(&loaded);
    }
    Ok(())
}

fn read(path: &Path) -> TaskfileResult<String> {
    fs::read_to_string(path).map_err(|source| TaskfileError::Read {
        path: path.to_path_buf(),
        source,
    })
}
