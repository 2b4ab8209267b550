//! Positional argument handling
//!
//! Positionals are split at the `--` separator into task tokens and a
//! pass-through string, then the task tokens are turned into calls under
//! the grammar of the Taskfile's schema version.

use crate::error::{CliError, Result};
use crate::quote::quote_join;
use crate::taskfile::{Call, SchemaVersion, Var, VariableSet};

/// Task called when no task name is given
pub const DEFAULT_TASK: &str = "default";

/// Variable holding the pass-through arguments
pub const CLI_ARGS: &str = "CLI_ARGS";

/// Split positionals into task tokens and the shell-quoted arguments that
/// followed the separator.
///
/// Each pass-through argument is quoted on its own and the results are
/// joined with single spaces, so word-splitting the string in a POSIX shell
/// gives back the original arguments.
pub fn split_args(positionals: &[String], dash_pos: Option<usize>) -> Result<(Vec<String>, String)> {
    let Some(pos) = dash_pos else {
        return Ok((positionals.to_vec(), String::new()));
    };
    let pos = pos.min(positionals.len());

    let cli_args = quote_join(&positionals[pos..]).map_err(|(arg, e)| CliError::ArgumentEncoding {
        arg,
        reason: e.to_string(),
    })?;
    Ok((positionals[..pos].to_vec(), cli_args))
}

/// Interpret task tokens as calls plus global variables
pub fn build_calls(tokens: &[String], version: SchemaVersion) -> Result<(Vec<Call>, VariableSet)> {
    if tokens.is_empty() {
        return Ok((vec![Call::new(DEFAULT_TASK)], VariableSet::new()));
    }

    match version {
        SchemaVersion::V3 { .. } => parse_v3(tokens),
        SchemaVersion::V2 { .. } => parse_v2(tokens),
    }
}

/// Store the pass-through string, replacing any user-supplied value.
/// The string reaches commands verbatim, without template expansion.
pub fn set_cli_args(globals: &mut VariableSet, cli_args: &str) {
    globals.set(CLI_ARGS, Var::literal(cli_args));
}

/// Version 3 grammar.
///
/// Any token containing `=` is an assignment. Assignments after the last
/// task name belong to that task; all others are globals.
fn parse_v3(tokens: &[String]) -> Result<(Vec<Call>, VariableSet)> {
    let last_task = tokens
        .iter()
        .rposition(|token| !token.contains('='))
        .ok_or_else(no_task_name)?;

    let mut calls: Vec<Call> = Vec::new();
    let mut globals = VariableSet::new();

    for (i, token) in tokens.iter().enumerate() {
        match split_assignment(token)? {
            None => calls.push(Call::new(token.as_str())),
            Some((name, value)) if i > last_task => {
                if let Some(call) = calls.last_mut() {
                    call.vars.set(name, Var::Static(value));
                }
            }
            Some((name, value)) => globals.set(name, Var::Static(value)),
        }
    }

    Ok((calls, globals))
}

/// Version 2 grammar: one task name followed by global assignments
fn parse_v2(tokens: &[String]) -> Result<(Vec<Call>, VariableSet)> {
    let (task, rest) = match tokens.split_first() {
        Some((first, rest)) if !first.contains('=') => (first, rest),
        _ => return Err(no_task_name()),
    };

    let mut globals = VariableSet::new();
    for token in rest {
        match split_assignment(token)? {
            Some((name, value)) => globals.set(name, Var::Static(value)),
            None => {
                return Err(CliError::MalformedArguments(format!(
                    "unexpected argument {:?}: Taskfiles before version 3 accept a single task followed by KEY=VALUE variables",
                    token
                )))
            }
        }
    }

    Ok((vec![Call::new(task.as_str())], globals))
}

/// `KEY=VALUE` split at the first `=`; `None` for a task name
fn split_assignment(token: &str) -> Result<Option<(String, String)>> {
    match token.split_once('=') {
        None => Ok(None),
        Some(("", _)) => Err(CliError::MalformedArguments(format!(
            "variable assignment {:?} has no name",
            token
        ))),
        Some((name, value)) => Ok(Some((name.to_string(), value.to_string()))),
    }
}

fn no_task_name() -> CliError {
    CliError::MalformedArguments("variables were given but no task name".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const V2: SchemaVersion = SchemaVersion::V2 { minor: 0 };
    const V3: SchemaVersion = SchemaVersion::V3 { minor: 0 };

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn vars(pairs: &[(&str, &str)]) -> VariableSet {
        pairs
            .iter()
            .map(|(k, v)| (*k, Var::static_value(*v)))
            .collect()
    }

    #[test]
    fn test_split_without_separator() {
        let positionals = strings(&["build", "X=1"]);
        let (tasks, cli_args) = split_args(&positionals, None).unwrap();
        assert_eq!(tasks, positionals);
        assert_eq!(cli_args, "");
    }

    #[test]
    fn test_split_quotes_passthrough() {
        let positionals = strings(&["build", "plain", "two words", "it's", "$HOME"]);
        let (tasks, cli_args) = split_args(&positionals, Some(1)).unwrap();
        assert_eq!(tasks, strings(&["build"]));
        assert_eq!(
            shlex::split(&cli_args).unwrap(),
            strings(&["plain", "two words", "it's", "$HOME"])
        );
        assert!(cli_args.starts_with("plain "));
    }

    #[test]
    fn test_split_empty_passthrough() {
        let positionals = strings(&["build"]);
        let (tasks, cli_args) = split_args(&positionals, Some(1)).unwrap();
        assert_eq!(tasks, positionals);
        assert_eq!(cli_args, "");
    }

    #[test]
    fn test_split_rejects_nul() {
        let positionals = strings(&["bad\0arg"]);
        let err = split_args(&positionals, Some(0)).unwrap_err();
        assert!(matches!(err, CliError::ArgumentEncoding { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_passthrough_survives_the_shell() {
        let original = strings(&["a b", "\"quoted\"", "'single'", "$VAR", "back\\slash", "*", ""]);
        let (_, cli_args) = split_args(&original, Some(0)).unwrap();

        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("for a in {}; do printf '%s\\n' \"$a\"; done", cli_args))
            .output()
            .unwrap();
        let printed: Vec<String> = String::from_utf8(output.stdout)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(printed, original);
    }

    #[test]
    fn test_no_tokens_calls_default() {
        for version in [V2, V3] {
            let (calls, globals) = build_calls(&[], version).unwrap();
            assert_eq!(calls, vec![Call::new("default")]);
            assert!(globals.is_empty());
        }
    }

    #[test]
    fn test_v3_placement() {
        let (calls, globals) = build_calls(&strings(&["build", "ENV=prod", "deploy", "REGION=us"]), V3).unwrap();
        assert_eq!(
            calls,
            vec![
                Call::new("build"),
                Call::new("deploy").with_vars(vars(&[("REGION", "us")])),
            ]
        );
        assert_eq!(globals, vars(&[("ENV", "prod")]));
    }

    #[test]
    fn test_v3_leading_assignments_are_global() {
        let (calls, globals) = build_calls(&strings(&["A=1", "build", "test"]), V3).unwrap();
        assert_eq!(calls, vec![Call::new("build"), Call::new("test")]);
        assert_eq!(globals, vars(&[("A", "1")]));
    }

    #[test]
    fn test_v3_value_may_contain_equals() {
        let (calls, _) = build_calls(&strings(&["build", "FLAGS=-a=b"]), V3).unwrap();
        assert_eq!(calls[0].vars, vars(&[("FLAGS", "-a=b")]));
    }

    #[test]
    fn test_v2_single_task_with_globals() {
        let (calls, globals) = build_calls(&strings(&["build", "ENV=prod", "REGION=us"]), V2).unwrap();
        assert_eq!(calls, vec![Call::new("build")]);
        assert_eq!(globals, vars(&[("ENV", "prod"), ("REGION", "us")]));
    }

    #[test]
    fn test_v2_rejects_second_task() {
        let err = build_calls(&strings(&["build", "deploy"]), V2).unwrap_err();
        assert!(matches!(err, CliError::MalformedArguments(_)));
    }

    #[test]
    fn test_assignments_without_task() {
        for version in [V2, V3] {
            let err = build_calls(&strings(&["ENV=prod"]), version).unwrap_err();
            assert!(matches!(err, CliError::MalformedArguments(_)));
        }
    }

    #[test]
    fn test_empty_variable_name() {
        let err = build_calls(&strings(&["build", "=x"]), V3).unwrap_err();
        assert!(err.to_string().contains("has no name"));
    }

    #[test]
    fn test_cli_args_overwrites_user_value() {
        let mut globals = vars(&[("CLI_ARGS", "user"), ("X", "1")]);
        set_cli_args(&mut globals, "'a b'");
        assert_eq!(globals.get("CLI_ARGS"), Some(&Var::literal("'a b'")));
        assert_eq!(globals.len(), 2);
    }
}
