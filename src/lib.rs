//! taskr - command line front end for a YAML task runner
//!
//! taskr reads a `Taskfile.yml`, turns the command line into task calls
//! with variables and runs them in the local shell.

// Public modules
pub mod cli;
pub mod error;
pub mod executor;
pub mod logger;
pub mod quote;
pub mod taskfile;
pub mod templater;

// Re-export commonly used types
pub use error::{CliError, Result};

/// Current version of taskr
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
