//! Taskfile model, discovery and validation
//!
//! This module handles parsing of Taskfile.yml documents and validation of
//! their structure.

pub mod parse;
pub mod schema;
pub mod types;
pub mod vars;
pub mod version;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
pub use vars::*;
pub use version::*;
