//! Taskfile schema version

use crate::error::{TaskfileError, TaskfileResult};
use serde_yaml::Value;
use std::fmt;

/// Declared Taskfile schema version; selects the command line grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V2 { minor: u32 },
    V3 { minor: u32 },
}

impl SchemaVersion {
    /// Parse a version string such as `3`, `3.0` or `2.6`
    pub fn parse(raw: &str) -> TaskfileResult<Self> {
        let raw = raw.trim();
        let mut parts = raw.splitn(3, '.');

        let major: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| TaskfileError::InvalidVersion(raw.to_string()))?;
        let minor: u32 = match parts.next() {
            Some(p) => p
                .parse()
                .map_err(|_| TaskfileError::InvalidVersion(raw.to_string()))?,
            None => 0,
        };

        match major {
            0 | 1 => Err(TaskfileError::UnsupportedVersion(raw.to_string())),
            2 => Ok(SchemaVersion::V2 { minor }),
            _ => Ok(SchemaVersion::V3 { minor }),
        }
    }

    /// Parse the raw `version` value of a Taskfile (string or number)
    pub fn from_yaml(value: Option<&Value>) -> TaskfileResult<Self> {
        match value {
            None | Some(Value::Null) => Err(TaskfileError::MissingVersion),
            Some(Value::String(s)) => Self::parse(s),
            Some(Value::Number(n)) => Self::parse(&n.to_string()),
            Some(other) => Err(TaskfileError::InvalidVersion(format!("{:?}", other))),
        }
    }

    pub fn is_v3(&self) -> bool {
        matches!(self, SchemaVersion::V3 { .. })
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V2 { minor } => write!(f, "2.{}", minor),
            SchemaVersion::V3 { minor } => write!(f, "3.{}", minor),
        }
    }
}
