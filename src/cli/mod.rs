//! CLI interface and argument parsing
//!
//! This module handles flag decoding, task/variable classification of the
//! positional arguments and dispatch to the executor.

pub mod app;
pub mod args;
pub mod flags;

// Re-export main types
pub use app::{run, run_with};
pub use args::{build_calls, split_args};
pub use flags::{parse_flags, Invocation, Options};
