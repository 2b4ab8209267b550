//! Variables and ordered variable sets

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;

/// A variable value: either a literal or a shell expression evaluated later
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Var {
    /// Value from the Taskfile; may contain templates
    Static(String),

    /// Value used exactly as given, never rendered
    Literal(String),

    /// Output of `sh -c <sh>`, with the trailing newline removed
    Dynamic { sh: String },
}

impl Var {
    pub fn static_value(value: impl Into<String>) -> Self {
        Var::Static(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Var::Literal(value.into())
    }

    /// The value as written, if it needs no shell evaluation
    pub fn as_static(&self) -> Option<&str> {
        match self {
            Var::Static(s) | Var::Literal(s) => Some(s),
            Var::Dynamic { .. } => None,
        }
    }
}

impl<'de> Deserialize<'de> for Var {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;

        match value {
            Value::String(s) => Ok(Var::Static(s)),
            Value::Bool(b) => Ok(Var::Static(b.to_string())),
            Value::Number(n) => Ok(Var::Static(n.to_string())),
            Value::Null => Ok(Var::Static(String::new())),
            Value::Mapping(map) => match map.get("sh") {
                Some(Value::String(sh)) => Ok(Var::Dynamic { sh: sh.clone() }),
                _ => Err(D::Error::custom(
                    "variable mapping must have a string \"sh\" key",
                )),
            },
            _ => Err(D::Error::custom(
                "variable must be a string, number, bool or {sh: ...}",
            )),
        }
    }
}

/// Insertion-ordered mapping from variable name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    entries: Vec<(String, Var)>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, var)| var)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert `name`, overwriting an existing value in place
    pub fn set(&mut self, name: impl Into<String>, var: Var) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = var,
            None => self.entries.push((name, var)),
        }
    }

    /// Left-biased merge: keys already present win, new keys are appended
    /// in `other`'s order.
    pub fn merge(&mut self, other: &VariableSet) {
        for (name, var) in &other.entries {
            if !self.contains(name) {
                self.entries.push((name.clone(), var.clone()));
            }
        }
    }

    /// Write every entry of `other` over this set
    pub fn override_with(&mut self, other: &VariableSet) {
        for (name, var) in &other.entries {
            self.set(name.clone(), var.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Var)> {
        self.entries.iter().map(|(name, var)| (name.as_str(), var))
    }
}

impl<K: Into<String>> FromIterator<(K, Var)> for VariableSet {
    fn from_iter<T: IntoIterator<Item = (K, Var)>>(iter: T) -> Self {
        let mut set = VariableSet::new();
        for (name, var) in iter {
            set.set(name, var);
        }
        set
    }
}

impl<'de> Deserialize<'de> for VariableSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VariableSetVisitor;

        impl<'de> Visitor<'de> for VariableSetVisitor {
            type Value = VariableSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of variable names to values")
            }

            fn visit_unit<E: de::Error>(self) -> Result<VariableSet, E> {
                Ok(VariableSet::new())
            }

            fn visit_map<A>(self, mut map: A) -> Result<VariableSet, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut set = VariableSet::new();
                while let Some((name, var)) = map.next_entry::<String, Var>()? {
                    set.set(name, var);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_any(VariableSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> VariableSet {
        pairs
            .iter()
            .map(|(k, v)| (*k, Var::static_value(*v)))
            .collect()
    }

    fn names(set: &VariableSet) -> Vec<&str> {
        set.iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_set_keeps_insertion_order() {
        let mut set = vars(&[("B", "1"), ("A", "2")]);
        set.set("B", Var::static_value("3"));
        assert_eq!(names(&set), vec!["B", "A"]);
        assert_eq!(set.get("B"), Some(&Var::static_value("3")));
    }

    #[test]
    fn test_merge_is_left_biased() {
        let mut left = vars(&[("ENV", "prod")]);
        left.merge(&vars(&[("ENV", "dev"), ("REGION", "us")]));
        assert_eq!(left.get("ENV").and_then(Var::as_static), Some("prod"));
        assert_eq!(left.get("REGION").and_then(Var::as_static), Some("us"));
        assert_eq!(names(&left), vec!["ENV", "REGION"]);
    }

    #[test]
    fn test_override_with_replaces() {
        let mut base = vars(&[("ENV", "dev"), ("KEEP", "x")]);
        base.override_with(&vars(&[("ENV", "prod")]));
        assert_eq!(base.get("ENV").and_then(Var::as_static), Some("prod"));
        assert_eq!(names(&base), vec!["ENV", "KEEP"]);
    }

    #[test]
    fn test_deserialize_preserves_order_and_kinds() {
        let yaml = r#"
ZED: last-alphabetically
PORT: 8080
DEBUG: true
REV:
  sh: git rev-parse HEAD
"#;
        let set: VariableSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(names(&set), vec!["ZED", "PORT", "DEBUG", "REV"]);
        assert_eq!(set.get("PORT"), Some(&Var::static_value("8080")));
        assert_eq!(set.get("DEBUG"), Some(&Var::static_value("true")));
        assert_eq!(
            set.get("REV"),
            Some(&Var::Dynamic {
                sh: "git rev-parse HEAD".to_string()
            })
        );
    }

    #[test]
    fn test_deserialize_rejects_bad_mapping() {
        let result: Result<VariableSet, _> = serde_yaml::from_str("X: {cmd: ls}");
        assert!(result.is_err());
    }
}
