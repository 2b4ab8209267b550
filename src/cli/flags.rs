//! Command line flag definitions and validation

use crate::error::{CliError, Result};
use crate::executor::ExecutorConfig;
use crate::taskfile::{GroupTemplates, OutputConfig, OutputStyle};
use crate::VERSION;
use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};

/// Separates task arguments from arguments passed through to commands
pub const SEPARATOR: &str = "--";

const ABOUT: &str = "Runs the specified task(s). Falls back to the \"default\" task if no task name
was specified.";

const AFTER_HELP: &str = "Example: 'task hello' with the following 'Taskfile.yml' file will generate an
'output.txt' file with the content \"hello\".

    version: '3'
    tasks:
      hello:
        cmds:
          - echo \"I am going to write a file named 'output.txt' now.\"
          - echo \"hello\" > output.txt
        generates:
          - output.txt

Arguments after '--' are passed to the tasks as {{ CLI_ARGS }}.";

/// Settings decoded from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub force: bool,
    pub watch: bool,
    pub verbose: bool,
    pub silent: bool,
    pub dry: bool,
    pub summary: bool,
    pub exit_code: bool,
    pub parallel: bool,
    pub status: bool,
    pub init: bool,
    pub list: bool,
    pub list_all: bool,
    pub color: bool,
    /// 0 means unlimited
    pub concurrency: usize,
    pub interval: String,
    pub dir: Option<PathBuf>,
    /// Taskfile base name; `dir` holds its directory
    pub entrypoint: Option<PathBuf>,
    pub output: OutputConfig,
}

impl Options {
    /// Executor settings for these options
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            force: self.force,
            watch: self.watch,
            verbose: self.verbose,
            silent: self.silent,
            dry: self.dry,
            summary: self.summary,
            parallel: self.parallel,
            color: self.color,
            concurrency: self.concurrency,
            interval: self.interval.clone(),
            dir: self.dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            entrypoint: self.entrypoint.clone(),
            output: self.output.clone(),
        }
    }
}

/// Result of decoding the command line
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Help or version text to print before exiting successfully
    Info(String),
    Run {
        options: Options,
        /// Task tokens followed by every argument after the separator
        positionals: Vec<String>,
        /// Index in `positionals` where the separator stood
        dash_pos: Option<usize>,
    },
}

/// Build the clap command describing every flag
pub fn build_command() -> Command {
    Command::new("task")
        .about(ABOUT)
        .override_usage("task [OPTIONS] [TASK...] [-- CLI_ARGS...]")
        .after_help(AFTER_HELP)
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .long("version")
                .help("Show Task version")
                .action(ArgAction::SetTrue),
        )
        .arg(flag("init", 'i', "Creates a new Taskfile.yml in the current folder"))
        .arg(flag("list", 'l', "Lists tasks with description of current Taskfile"))
        .arg(flag("list-all", 'a', "Lists tasks with or without a description"))
        .arg(
            Arg::new("status")
                .long("status")
                .help("Exits with non-zero exit code if any of the given tasks is not up-to-date")
                .action(ArgAction::SetTrue),
        )
        .arg(flag("force", 'f', "Forces execution even when the task is up-to-date"))
        .arg(flag("watch", 'w', "Enables watch of the given task"))
        .arg(flag("verbose", 'v', "Enables verbose mode"))
        .arg(flag("silent", 's', "Disables echoing"))
        .arg(flag(
            "parallel",
            'p',
            "Executes tasks provided on command line in parallel",
        ))
        .arg(flag(
            "dry",
            'n',
            "Compiles and prints tasks in the order that they would be run, without executing them",
        ))
        .arg(
            Arg::new("summary")
                .long("summary")
                .help("Show summary about a task")
                .action(ArgAction::SetTrue),
        )
        .arg(flag("exit-code", 'x', "Pass-through the exit code of the task command"))
        .arg(
            Arg::new("dir")
                .short('d')
                .long("dir")
                .value_name("DIR")
                .help("Sets directory of execution")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("taskfile")
                .short('t')
                .long("taskfile")
                .value_name("FILE")
                .help("Choose which Taskfile to run. Defaults to \"Taskfile.yml\"")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("STYLE")
                .help("Sets output style")
                .value_parser(value_parser!(OutputStyle)),
        )
        .arg(
            Arg::new("output-group-begin")
                .long("output-group-begin")
                .value_name("TEMPLATE")
                .help("Message template to print before a task's grouped output"),
        )
        .arg(
            Arg::new("output-group-end")
                .long("output-group-end")
                .value_name("TEMPLATE")
                .help("Message template to print after a task's grouped output"),
        )
        .arg(
            Arg::new("color")
                .short('c')
                .long("color")
                .value_name("BOOL")
                .help("Colored output. Enabled by default. Set flag to false or use NO_COLOR=1 to disable")
                .num_args(0..=1)
                .require_equals(true)
                .default_value("true")
                .default_missing_value("true")
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new("concurrency")
                .short('C')
                .long("concurrency")
                .value_name("N")
                .help("Limit number tasks to run concurrently")
                .default_value("0")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("interval")
                .short('I')
                .long("interval")
                .value_name("DURATION")
                .help("Interval to watch for changes")
                .default_value("5s"),
        )
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .help("Tasks to run and KEY=VALUE variables")
                .num_args(0..)
                .action(ArgAction::Append),
        )
}

fn flag(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .action(ArgAction::SetTrue)
}

/// Decode `argv` (program name first), reading `NO_COLOR` from the
/// environment
pub fn parse_flags<I, T>(argv: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let no_color = std::env::var_os("NO_COLOR").map_or(false, |v| !v.is_empty());
    parse_flags_with(argv, no_color)
}

/// Decode `argv`; `no_color` forces color off
pub fn parse_flags_with<I, T>(argv: I, no_color: bool) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let argv: Vec<String> = argv.into_iter().map(Into::into).collect();

    // Everything after the first bare `--` is positional; clap never sees it
    let (flags, passthrough) = match argv.iter().skip(1).position(|a| a == SEPARATOR) {
        Some(pos) => (&argv[..pos + 1], Some(&argv[pos + 2..])),
        None => (&argv[..], None),
    };

    // `--version` wins over everything else, including invalid flag values
    if flags.iter().skip(1).any(|a| a == "--version") {
        return Ok(Invocation::Info(format!("Task version: {}\n", VERSION)));
    }

    let matches = match build_command().try_get_matches_from(flags) {
        Ok(matches) => matches,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            return Ok(Invocation::Info(e.render().to_string()))
        }
        Err(e) => return Err(CliError::Usage(e)),
    };

    let options = options_from(&matches, no_color)?;

    let mut positionals: Vec<String> = matches
        .get_many::<String>("tasks")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let dash_pos = passthrough.map(|rest| {
        let pos = positionals.len();
        positionals.extend(rest.iter().cloned());
        pos
    });

    Ok(Invocation::Run {
        options,
        positionals,
        dash_pos,
    })
}

fn options_from(matches: &ArgMatches, no_color: bool) -> Result<Options> {
    let mut dir = matches.get_one::<PathBuf>("dir").cloned();
    let mut entrypoint = matches.get_one::<PathBuf>("taskfile").cloned();

    if dir.is_some() && entrypoint.is_some() {
        return Err(CliError::InvalidFlagCombination(
            "You can't set both --dir and --taskfile".to_string(),
        ));
    }
    if let Some(path) = entrypoint.take() {
        let (parent, name) = split_entrypoint(&path);
        dir = Some(parent);
        entrypoint = Some(name);
    }

    let style = matches.get_one::<OutputStyle>("output").copied();
    let group = GroupTemplates {
        begin: string_arg(matches, "output-group-begin"),
        end: string_arg(matches, "output-group-end"),
    };
    if style != Some(OutputStyle::Group) {
        for (name, value) in [("begin", &group.begin), ("end", &group.end)] {
            if !value.is_empty() {
                return Err(CliError::InvalidFlagCombination(format!(
                    "You can't set --output-group-{} without --output=group",
                    name
                )));
            }
        }
    }

    let color = matches.get_one::<bool>("color").copied().unwrap_or(true);

    Ok(Options {
        force: matches.get_flag("force"),
        watch: matches.get_flag("watch"),
        verbose: matches.get_flag("verbose"),
        silent: matches.get_flag("silent"),
        dry: matches.get_flag("dry"),
        summary: matches.get_flag("summary"),
        exit_code: matches.get_flag("exit-code"),
        parallel: matches.get_flag("parallel"),
        status: matches.get_flag("status"),
        init: matches.get_flag("init"),
        list: matches.get_flag("list"),
        list_all: matches.get_flag("list-all"),
        color: color && !no_color,
        concurrency: matches.get_one::<usize>("concurrency").copied().unwrap_or(0),
        interval: string_arg(matches, "interval"),
        dir,
        entrypoint,
        output: OutputConfig { style, group },
    })
}

fn string_arg(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

/// `a/b/Taskfile.yml` becomes (`a/b`, `Taskfile.yml`); a bare name stays
/// in the current directory
fn split_entrypoint(path: &Path) -> (PathBuf, PathBuf) {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf());
    (parent, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Invocation> {
        let mut argv = vec!["task"];
        argv.extend_from_slice(args);
        parse_flags_with(argv, false)
    }

    fn run_parts(args: &[&str]) -> (Options, Vec<String>, Option<usize>) {
        match parse(args).unwrap() {
            Invocation::Run {
                options,
                positionals,
                dash_pos,
            } => (options, positionals, dash_pos),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let (options, positionals, dash_pos) = run_parts(&[]);
        assert!(options.color);
        assert_eq!(options.concurrency, 0);
        assert_eq!(options.interval, "5s");
        assert_eq!(options.dir, None);
        assert_eq!(options.output, OutputConfig::default());
        assert!(positionals.is_empty());
        assert_eq!(dash_pos, None);
    }

    #[test]
    fn test_short_flags_and_tasks() {
        let (options, positionals, _) = run_parts(&["-fwvsp", "-n", "-x", "build", "ENV=prod", "-C", "2"]);
        assert!(options.force && options.watch && options.verbose && options.silent);
        assert!(options.parallel && options.dry && options.exit_code);
        assert_eq!(options.concurrency, 2);
        assert_eq!(positionals, vec!["build", "ENV=prod"]);
    }

    #[test]
    fn test_separator_splits_positionals() {
        let (_, positionals, dash_pos) = run_parts(&["build", "--", "-v", "a b", "--"]);
        assert_eq!(positionals, vec!["build", "-v", "a b", "--"]);
        assert_eq!(dash_pos, Some(1));

        let (options, positionals, dash_pos) = run_parts(&["--", "--silent"]);
        assert!(!options.silent);
        assert_eq!(positionals, vec!["--silent"]);
        assert_eq!(dash_pos, Some(0));
    }

    #[test]
    fn test_version_and_help() {
        assert_eq!(
            parse(&["--version", "build"]).unwrap(),
            Invocation::Info(format!("Task version: {}\n", VERSION))
        );
        match parse(&["-h"]).unwrap() {
            Invocation::Info(text) => assert!(text.contains("--list-all")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_version_ignores_other_flags() {
        let version = Invocation::Info(format!("Task version: {}\n", VERSION));
        assert_eq!(parse(&["--version", "-C", "abc"]).unwrap(), version);
        assert_eq!(parse(&["--bogus", "--version"]).unwrap(), version);
        assert_eq!(
            parse(&["--version", "--dir", "a", "--taskfile", "b/T.yml"]).unwrap(),
            version
        );

        // After the separator it is a pass-through argument
        assert!(matches!(
            parse(&["build", "--", "--version"]).unwrap(),
            Invocation::Run { .. }
        ));
    }

    #[test]
    fn test_unknown_flag_is_usage_error() {
        let err = parse(&["--bogus"]).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
        assert_eq!(err.exit_code(false), 2);
    }

    #[test]
    fn test_dir_and_taskfile_conflict() {
        let err = parse(&["--dir", "/nonexistent", "--taskfile", "/nonexistent/T.yml"]).unwrap_err();
        assert_eq!(err.to_string(), "task: You can't set both --dir and --taskfile");
    }

    #[test]
    fn test_taskfile_splits_into_dir() {
        let (options, _, _) = run_parts(&["-t", "sub/dir/Custom.yml"]);
        assert_eq!(options.dir, Some(PathBuf::from("sub/dir")));
        assert_eq!(options.entrypoint, Some(PathBuf::from("Custom.yml")));

        let (options, _, _) = run_parts(&["--taskfile=Custom.yml"]);
        assert_eq!(options.dir, Some(PathBuf::from(".")));
        assert_eq!(options.entrypoint, Some(PathBuf::from("Custom.yml")));
    }

    #[test]
    fn test_group_templates_need_group_style() {
        let err = parse(&["--output-group-begin", "start"]).unwrap_err();
        assert!(matches!(err, CliError::InvalidFlagCombination(_)));
        assert!(err.to_string().contains("--output-group-begin"));

        let err = parse(&["-o", "prefixed", "--output-group-end", "end"]).unwrap_err();
        assert!(err.to_string().contains("--output-group-end"));

        let (options, _, _) = run_parts(&["--output=group", "--output-group-begin", "start"]);
        assert_eq!(options.output.style, Some(OutputStyle::Group));
        assert_eq!(options.output.group.begin, "start");
    }

    #[test]
    fn test_color_flag() {
        assert!(!run_parts(&["--color=false"]).0.color);
        assert!(run_parts(&["-c"]).0.color);
        assert!(!run_parts(&["--color=0", "build"]).0.color);

        match parse_flags_with(["task"], true).unwrap() {
            Invocation::Run { options, .. } => assert!(!options.color),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_executor_config() {
        let (options, _, _) = run_parts(&["-d", "proj", "-I", "1s", "--summary"]);
        let config = options.executor_config();
        assert_eq!(config.dir, PathBuf::from("proj"));
        assert_eq!(config.interval, "1s");
        assert!(config.summary);
    }
}
