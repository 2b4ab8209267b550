//! Core Taskfile types
//!
//! This module defines the data structures that represent a Taskfile.yml
//! document and the calls made against it.

use crate::taskfile::vars::VariableSet;
use clap::ValueEnum;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Top-level Taskfile structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Taskfile {
    /// Schema version, kept raw until asked for
    #[serde(default)]
    pub version: Option<Value>,

    /// Output style for task output
    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Dotenv files loaded before anything runs
    #[serde(default)]
    pub dotenv: Vec<String>,

    /// Global variables
    #[serde(default)]
    pub vars: VariableSet,

    /// Global environment
    #[serde(default)]
    pub env: VariableSet,

    /// Tasks defined in the Taskfile
    #[serde(default, deserialize_with = "deserialize_tasks")]
    pub tasks: BTreeMap<String, Task>,
}

/// A task definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    /// One-line description shown by --list
    #[serde(default)]
    pub desc: Option<String>,

    /// Longer description shown by --summary
    #[serde(default)]
    pub summary: Option<String>,

    /// Internal tasks can only be called by other tasks
    #[serde(default)]
    pub internal: bool,

    /// Do not echo commands
    #[serde(default)]
    pub silent: bool,

    /// Working directory, relative to the Taskfile directory
    #[serde(default)]
    pub dir: Option<String>,

    /// Tasks that run before this one
    #[serde(default, deserialize_with = "deserialize_deps")]
    pub deps: Vec<Call>,

    #[serde(default)]
    pub vars: VariableSet,

    #[serde(default)]
    pub env: VariableSet,

    /// Input globs for the up-to-date check
    #[serde(default)]
    pub sources: Vec<String>,

    /// Output globs for the up-to-date check
    #[serde(default)]
    pub generates: Vec<String>,

    /// Commands that all succeed when the task is up to date
    #[serde(default)]
    pub status: Vec<String>,

    /// Commands to execute
    #[serde(default, deserialize_with = "deserialize_cmds")]
    pub cmds: Vec<Cmd>,

    /// Keep going when a command fails
    #[serde(default)]
    pub ignore_error: bool,
}

impl Task {
    pub fn has_description(&self) -> bool {
        self.desc.as_deref().map_or(false, |d| !d.trim().is_empty())
    }
}

/// One step of a task
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Shell command
    Command {
        cmd: String,
        silent: bool,
        ignore_error: bool,
    },

    /// Call to another task
    Task(Call),
}

impl Cmd {
    pub fn command(cmd: impl Into<String>) -> Self {
        Cmd::Command {
            cmd: cmd.into(),
            silent: false,
            ignore_error: false,
        }
    }
}

/// One requested invocation of a task
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Call {
    pub task: String,
    pub vars: VariableSet,
}

impl Call {
    pub fn new(task: impl Into<String>) -> Self {
        Call {
            task: task.into(),
            vars: VariableSet::new(),
        }
    }

    pub fn with_vars(mut self, vars: VariableSet) -> Self {
        self.vars = vars;
        self
    }
}

/// How output of concurrently running commands is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputStyle {
    /// Output is written as soon as it is produced
    Interleaved,
    /// Output of each task is printed as one block
    Group,
    /// Every line is prefixed with the task name
    Prefixed,
}

/// Message templates wrapped around grouped output
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GroupTemplates {
    #[serde(default)]
    pub begin: String,
    #[serde(default)]
    pub end: String,
}

impl GroupTemplates {
    pub fn is_empty(&self) -> bool {
        self.begin.is_empty() && self.end.is_empty()
    }
}

/// Output style plus templates used only by the group style
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// `None` leaves the choice to the Taskfile, then to interleaved
    pub style: Option<OutputStyle>,
    pub group: GroupTemplates,
}

impl OutputConfig {
    pub fn is_set(&self) -> bool {
        self.style.is_some()
    }
}

impl<'de> Deserialize<'de> for OutputConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;

        match value {
            Value::String(s) => {
                let style = OutputStyle::from_str(&s, true).map_err(|_| {
                    D::Error::custom(format!(
                        "unknown output style {:?}: expected interleaved, group or prefixed",
                        s
                    ))
                })?;
                Ok(OutputConfig {
                    style: Some(style),
                    group: GroupTemplates::default(),
                })
            }
            Value::Mapping(map) => match map.get("group") {
                Some(group) => {
                    let group = GroupTemplates::deserialize(group.clone())
                        .map_err(D::Error::custom)?;
                    Ok(OutputConfig {
                        style: Some(OutputStyle::Group),
                        group,
                    })
                }
                None => Err(D::Error::custom("output mapping must have a \"group\" key")),
            },
            Value::Null => Ok(OutputConfig::default()),
            _ => Err(D::Error::custom("output must be a string or mapping")),
        }
    }
}

/// Tasks may be written as a bare command or a list of commands
fn deserialize_tasks<'de, D>(deserializer: D) -> Result<BTreeMap<String, Task>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    let mut tasks = BTreeMap::new();

    for (name, value) in raw {
        let task = match value {
            Value::String(cmd) => Task {
                cmds: vec![Cmd::command(cmd)],
                ..Task::default()
            },
            Value::Sequence(_) => Task {
                cmds: commands_from_value(value).map_err(D::Error::custom)?,
                ..Task::default()
            },
            Value::Null => Task::default(),
            other => Task::deserialize(other)
                .map_err(|e| D::Error::custom(format!("task \"{}\": {}", name, e)))?,
        };
        tasks.insert(name, task);
    }

    Ok(tasks)
}

/// Raw shape of a mapping entry under `cmds`
#[derive(Deserialize)]
struct CmdDetail {
    #[serde(default)]
    cmd: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    vars: VariableSet,
    #[serde(default)]
    silent: bool,
    #[serde(default)]
    ignore_error: bool,
}

fn command_from_value(value: Value) -> Result<Cmd, String> {
    match value {
        Value::String(s) => Ok(Cmd::command(s)),
        Value::Mapping(_) => {
            let detail = CmdDetail::deserialize(value).map_err(|e| e.to_string())?;
            match (detail.cmd, detail.task) {
                (Some(cmd), None) => Ok(Cmd::Command {
                    cmd,
                    silent: detail.silent,
                    ignore_error: detail.ignore_error,
                }),
                (None, Some(task)) => Ok(Cmd::Task(Call::new(task).with_vars(detail.vars))),
                (Some(_), Some(_)) => Err("command cannot have both \"cmd\" and \"task\"".into()),
                (None, None) => Err("command must have \"cmd\" or \"task\"".into()),
            }
        }
        _ => Err("command must be a string or mapping".into()),
    }
}

fn commands_from_value(value: Value) -> Result<Vec<Cmd>, String> {
    match value {
        Value::Sequence(seq) => seq.into_iter().map(command_from_value).collect(),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![command_from_value(single)?]),
    }
}

/// Custom deserializer for commands that handles both single values and arrays
fn deserialize_cmds<'de, D>(deserializer: D) -> Result<Vec<Cmd>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    commands_from_value(value).map_err(D::Error::custom)
}

/// Dependencies are task names or `{task, vars}` mappings
fn deserialize_deps<'de, D>(deserializer: D) -> Result<Vec<Call>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    struct DepDetail {
        task: String,
        #[serde(default)]
        vars: VariableSet,
    }

    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Sequence(seq) => seq,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(D::Error::custom("deps must be a list")),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(Call::new(name)),
            Value::Mapping(_) => DepDetail::deserialize(item)
                .map(|d| Call::new(d.task).with_vars(d.vars))
                .map_err(D::Error::custom),
            _ => Err(D::Error::custom("dependency must be a task name or mapping")),
        })
        .collect()
}
