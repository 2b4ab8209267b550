//! End-to-end tests of the `task` binary

#![cfg(unix)]

mod common;

use common::{create_taskfile, create_taskfile_with_subdir, read, task_in};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const TASKFILE: &str = r#"
version: '3'
vars:
  ENV: dev
tasks:
  default:
    cmds:
      - echo default > default.txt
  build:
    desc: Build it
    cmds:
      - echo "build {{ ENV }} {{ REGION }}" >> calls.txt
  deploy:
    desc: Deploy it
    cmds:
      - echo "deploy {{ ENV }} {{ REGION }}" >> calls.txt
  args:
    cmds:
      - printf '%s\n' {{ CLI_ARGS }} > args.txt
  fail:
    cmds:
      - exit 7
  gen:
    status:
      - test -f gen.txt
    cmds:
      - touch gen.txt
  hello:
    cmds:
      - echo hi
  length:
    cmds:
      - 'X={{ ENV }}; echo ${#X} > len.txt'
  internal-only:
    internal: true
    cmds: [echo hidden]
"#;

#[test]
fn test_version() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("Task version: {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_wins_over_bad_flag_values() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path())
        .args(["--version", "-C", "abc"])
        .assert()
        .success()
        .stdout(format!("Task version: {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-group-begin"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path()).arg("--bogus").assert().code(2);
}

#[test]
fn test_dir_and_taskfile_rejected_before_loading() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path())
        .args(["--dir", "missing", "--taskfile", "missing/Taskfile.yml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("You can't set both --dir and --taskfile"));
}

#[test]
fn test_group_begin_requires_group_output() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path())
        .args(["--output-group-begin", "start"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "You can't set --output-group-begin without --output=group",
        ));
}

#[test]
fn test_missing_taskfile() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path())
        .args(["-d", ".", "build"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("task:"));
}

#[test]
fn test_list_silent_with_no_tasks() {
    let (temp_dir, _) = create_taskfile("version: '3'\n");
    task_in(temp_dir.path())
        .args(["--list", "--silent"])
        .assert()
        .success()
        .stdout("task: No tasks available\n");
}

#[test]
fn test_list_silent_prints_names_only() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["--list", "--silent"])
        .assert()
        .success()
        .stdout("build\ndeploy\n");
}

#[test]
fn test_list_all_silent_hides_internal_tasks() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["--list-all", "--silent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello\n"))
        .stdout(predicate::str::contains("internal-only").not());
}

#[test]
fn test_list_with_no_described_tasks() {
    let (temp_dir, _) = create_taskfile("version: '3'\ntasks:\n  a: echo a\n");
    task_in(temp_dir.path())
        .arg("--list")
        .assert()
        .success()
        .stdout("task: No tasks with description available. Try --list-all to list all tasks\n");
}

#[test]
fn test_list_described_tasks() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .arg("-l")
        .assert()
        .success()
        .stdout("task: Available tasks for this project:\n* build:  Build it\n* deploy: Deploy it\n");
}

#[test]
fn test_list_all_hides_internal_tasks() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .arg("--list-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("* hello:"))
        .stdout(predicate::str::contains("internal-only").not());
}

#[test]
fn test_default_task() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("task: [default] echo default > default.txt"));
    assert_eq!(read(temp_dir.path(), "default.txt"), "default\n");
}

#[test]
fn test_variable_placement() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["build", "ENV=prod", "deploy", "REGION=us"])
        .assert()
        .success();
    assert_eq!(
        read(temp_dir.path(), "calls.txt"),
        "build prod \ndeploy prod us\n"
    );
}

#[test]
fn test_cli_args_passthrough() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["args", "--", "two words", "it's", "$HOME", "--silent"])
        .assert()
        .success();
    assert_eq!(
        read(temp_dir.path(), "args.txt"),
        "two words\nit's\n$HOME\n--silent\n"
    );
}

#[test]
fn test_cli_args_are_not_templates() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["-s", "args", "--", "{{ 1 + 1 }}", "{{", "{%"])
        .assert()
        .success();
    assert_eq!(read(temp_dir.path(), "args.txt"), "{{ 1 + 1 }}\n{{\n{%\n");
}

#[test]
fn test_shell_length_expansion_in_command() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path()).args(["length", "ENV=abcd"]).assert().success();
    assert_eq!(read(temp_dir.path(), "len.txt"), "4\n");
}

#[test]
fn test_exit_code_passthrough() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["-x", "fail"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Failed to run task \"fail\""));
    task_in(temp_dir.path()).arg("fail").assert().code(1);
}

#[test]
fn test_unknown_task() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .arg("nope")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Task \"nope\" does not exist"));
}

#[test]
fn test_status() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["--status", "gen"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Task \"gen\" is not up-to-date"));
    assert!(!temp_dir.path().join("gen.txt").exists(), "status runs nothing");

    task_in(temp_dir.path()).arg("gen").assert().success();
    task_in(temp_dir.path()).args(["--status", "gen"]).assert().success();
}

#[test]
fn test_init() {
    let temp_dir = TempDir::new().unwrap();
    task_in(temp_dir.path())
        .arg("--init")
        .assert()
        .success()
        .stdout("Taskfile.yml created in the current directory\n");
    assert!(read(temp_dir.path(), "Taskfile.yml").contains("GREETING"));

    task_in(temp_dir.path()).arg("-i").assert().code(1);

    task_in(temp_dir.path())
        .assert()
        .success()
        .stdout("Hello, World!\n");
}

#[test]
fn test_taskfile_flag_from_other_directory() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("project");
    fs::create_dir(&project).unwrap();
    fs::write(
        project.join("Custom.yml"),
        "version: '3'\ntasks:\n  where: pwd > where.txt\n",
    )
    .unwrap();

    task_in(temp_dir.path())
        .args(["-t", "project/Custom.yml", "where"])
        .assert()
        .success();
    assert!(read(&project, "where.txt").trim_end().ends_with("project"));
}

#[test]
fn test_taskfile_found_from_subdirectory() {
    let (temp_dir, _, sub_dir) = create_taskfile_with_subdir(TASKFILE);
    task_in(&sub_dir).arg("default").assert().success();
    assert_eq!(read(temp_dir.path(), "default.txt"), "default\n");
}

#[test]
fn test_v2_accepts_a_single_task() {
    let (temp_dir, _) = create_taskfile(
        "version: '2'\ntasks:\n  build: echo \"{{ ENV }}\" > env.txt\n  other: echo other\n",
    );
    task_in(temp_dir.path())
        .args(["build", "ENV=prod"])
        .assert()
        .success();
    assert_eq!(read(temp_dir.path(), "env.txt"), "prod\n");

    task_in(temp_dir.path())
        .args(["build", "other"])
        .assert()
        .code(1);
}

#[test]
fn test_dry_run() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["--dry", "default"])
        .assert()
        .success()
        .stderr(predicate::str::contains("echo default > default.txt"));
    assert!(!temp_dir.path().join("default.txt").exists());
}

#[test]
fn test_prefixed_output() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["--output=prefixed", "--silent", "hello"])
        .assert()
        .success()
        .stdout("[hello] hi\n");
}

#[test]
fn test_group_output() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args([
            "-s",
            "-o",
            "group",
            "--output-group-begin",
            "begin {{ TASK }}",
            "--output-group-end",
            "end {{ TASK }}",
            "hello",
        ])
        .assert()
        .success()
        .stdout("begin hello\nhi\nend hello\n");
}

#[test]
fn test_summary() {
    let (temp_dir, _) = create_taskfile(TASKFILE);
    task_in(temp_dir.path())
        .args(["--summary", "build"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("task: build\n\nBuild it\n"));
    assert!(!temp_dir.path().join("calls.txt").exists());
}
