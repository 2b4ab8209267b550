//! Common test utilities

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary directory with a Taskfile.yml file
pub fn create_taskfile(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let taskfile_path = temp_dir.path().join("Taskfile.yml");
    fs::write(&taskfile_path, content).unwrap();
    (temp_dir, taskfile_path)
}

/// Create a Taskfile and an empty subdirectory next to it
pub fn create_taskfile_with_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let (temp_dir, taskfile_path) = create_taskfile(content);
    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();
    (temp_dir, taskfile_path, sub_dir)
}

/// The `task` binary running in `dir` with color disabled
pub fn task_in(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("task").unwrap();
    cmd.current_dir(dir).env("NO_COLOR", "1");
    cmd
}

/// Contents of `name` inside `dir`, empty when missing
pub fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap_or_default()
}
