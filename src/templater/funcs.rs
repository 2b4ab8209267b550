//! Template function registry
//!
//! A generic base library merged with the task-specific functions. Task
//! functions are registered last and shadow base functions of the same name.
//! The merged map is built once per process and never changes afterwards.

use crate::quote;
use minijinja::{Error, ErrorKind, Value};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::env::consts;
use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR};
use std::sync::Arc;

/// A pure template function taking positional arguments
pub type TemplateFunc = Arc<dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync>;

/// Name to function mapping handed to the template engine
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: BTreeMap<&'static str, TemplateFunc>,
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, replacing any previous entry
    pub fn insert<F>(&mut self, name: &'static str, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.funcs.insert(name, Arc::new(func));
    }

    /// Register an existing function under another name
    pub fn alias(&mut self, alias: &'static str, target: &str) {
        if let Some(func) = self.funcs.get(target).cloned() {
            self.funcs.insert(alias, func);
        }
    }

    /// Add every entry of `other`, shadowing entries with the same name
    pub fn extend(&mut self, other: FuncMap) {
        self.funcs.extend(other.funcs);
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFunc> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TemplateFunc)> {
        self.funcs.iter().map(|(name, func)| (*name, func))
    }
}

static TEMPLATE_FUNCS: Lazy<FuncMap> = Lazy::new(|| {
    let mut funcs = base_funcs();
    funcs.extend(task_funcs());
    funcs
});

/// The process-wide function registry, built on first use
pub fn template_funcs() -> &'static FuncMap {
    &TEMPLATE_FUNCS
}

/// Operating system name as Taskfiles expect it (`linux`, `darwin`, `windows`, ...)
pub fn os_name() -> &'static str {
    match consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// CPU architecture as Taskfiles expect it (`amd64`, `arm64`, `386`, ...)
pub fn arch_name() -> &'static str {
    match consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        other => other,
    }
}

fn task_funcs() -> FuncMap {
    let mut funcs = FuncMap::new();

    funcs.insert("OS", |args| {
        expect_args("OS", args, 0)?;
        Ok(Value::from(os_name()))
    });
    funcs.insert("ARCH", |args| {
        expect_args("ARCH", args, 0)?;
        Ok(Value::from(arch_name()))
    });
    funcs.insert("catLines", |args| {
        let s = unary_str("catLines", args)?;
        Ok(Value::from(s.replace("\r\n", " ").replace('\n', " ")))
    });
    funcs.insert("splitLines", |args| {
        let s = unary_str("splitLines", args)?;
        let lines: Vec<String> = s.replace("\r\n", "\n").split('\n').map(String::from).collect();
        Ok(Value::from(lines))
    });
    funcs.insert("fromSlash", |args| {
        let path = unary_str("fromSlash", args)?;
        Ok(Value::from(from_slash(&path)))
    });
    funcs.insert("toSlash", |args| {
        let path = unary_str("toSlash", args)?;
        Ok(Value::from(to_slash(&path)))
    });
    funcs.insert("exeExt", |args| {
        expect_args("exeExt", args, 0)?;
        Ok(Value::from(consts::EXE_SUFFIX))
    });
    funcs.insert("shellQuote", |args| {
        let s = unary_str("shellQuote", args)?;
        let quoted = quote::quote(&s).map_err(|e| invalid("shellQuote", e))?;
        Ok(Value::from(quoted.into_owned()))
    });
    funcs.insert("splitArgs", |args| {
        let s = unary_str("splitArgs", args)?;
        let words = shlex::split(&s).ok_or_else(|| invalid("splitArgs", "unbalanced quoting"))?;
        Ok(Value::from(words))
    });
    // Kept for old Taskfiles; commands always run in a POSIX shell
    funcs.insert("IsSH", |args| {
        expect_args("IsSH", args, 0)?;
        Ok(Value::from(true))
    });
    funcs.insert("joinPath", |args| {
        let elems = args
            .iter()
            .enumerate()
            .map(|(i, _)| str_arg("joinPath", args, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::from(join_path(&elems)))
    });
    funcs.insert("relPath", |args| {
        expect_args("relPath", args, 2)?;
        let base = str_arg("relPath", args, 0)?;
        let target = str_arg("relPath", args, 1)?;
        let rel = rel_path(&base, &target).map_err(|e| invalid("relPath", e))?;
        Ok(Value::from(rel))
    });

    // Deprecated spellings
    funcs.alias("FromSlash", "fromSlash");
    funcs.alias("ToSlash", "toSlash");
    funcs.alias("ExeExt", "exeExt");

    funcs
}

/// General purpose string and path helpers
fn base_funcs() -> FuncMap {
    let mut funcs = FuncMap::new();

    funcs.insert("upper", |args| Ok(Value::from(unary_str("upper", args)?.to_uppercase())));
    funcs.insert("lower", |args| Ok(Value::from(unary_str("lower", args)?.to_lowercase())));
    funcs.insert("title", |args| {
        let s = unary_str("title", args)?;
        let titled: Vec<String> = s
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect();
        Ok(Value::from(titled.join(" ")))
    });
    funcs.insert("trim", |args| Ok(Value::from(unary_str("trim", args)?.trim().to_string())));
    funcs.insert("trimPrefix", |args| {
        expect_args("trimPrefix", args, 2)?;
        let prefix = str_arg("trimPrefix", args, 0)?;
        let s = str_arg("trimPrefix", args, 1)?;
        Ok(Value::from(s.strip_prefix(prefix.as_str()).unwrap_or(s.as_str()).to_string()))
    });
    funcs.insert("trimSuffix", |args| {
        expect_args("trimSuffix", args, 2)?;
        let suffix = str_arg("trimSuffix", args, 0)?;
        let s = str_arg("trimSuffix", args, 1)?;
        Ok(Value::from(s.strip_suffix(suffix.as_str()).unwrap_or(s.as_str()).to_string()))
    });
    funcs.insert("replace", |args| {
        expect_args("replace", args, 3)?;
        let old = str_arg("replace", args, 0)?;
        let new = str_arg("replace", args, 1)?;
        let s = str_arg("replace", args, 2)?;
        Ok(Value::from(s.replace(old.as_str(), &new)))
    });
    funcs.insert("contains", |args| {
        expect_args("contains", args, 2)?;
        let needle = str_arg("contains", args, 0)?;
        Ok(Value::from(str_arg("contains", args, 1)?.contains(needle.as_str())))
    });
    funcs.insert("hasPrefix", |args| {
        expect_args("hasPrefix", args, 2)?;
        let prefix = str_arg("hasPrefix", args, 0)?;
        Ok(Value::from(str_arg("hasPrefix", args, 1)?.starts_with(prefix.as_str())))
    });
    funcs.insert("hasSuffix", |args| {
        expect_args("hasSuffix", args, 2)?;
        let suffix = str_arg("hasSuffix", args, 0)?;
        Ok(Value::from(str_arg("hasSuffix", args, 1)?.ends_with(suffix.as_str())))
    });
    funcs.insert("repeat", |args| {
        expect_args("repeat", args, 2)?;
        let count = args[0]
            .as_usize()
            .ok_or_else(|| invalid("repeat", "count must be a non-negative integer"))?;
        Ok(Value::from(str_arg("repeat", args, 1)?.repeat(count)))
    });
    funcs.insert("quote", |args| {
        let s = unary_str("quote", args)?;
        Ok(Value::from(format!("{:?}", s)))
    });
    funcs.insert("squote", |args| {
        let s = unary_str("squote", args)?;
        Ok(Value::from(format!("'{}'", s)))
    });
    funcs.insert("splitList", |args| {
        expect_args("splitList", args, 2)?;
        let sep = str_arg("splitList", args, 0)?;
        let s = str_arg("splitList", args, 1)?;
        let parts: Vec<String> = s.split(sep.as_str()).map(String::from).collect();
        Ok(Value::from(parts))
    });
    funcs.insert("join", |args| {
        expect_args("join", args, 2)?;
        let sep = str_arg("join", args, 0)?;
        let items = args[1]
            .try_iter()
            .map_err(|_| invalid("join", "second argument must be a list"))?
            .map(|item| item.to_string())
            .collect::<Vec<_>>();
        Ok(Value::from(items.join(sep.as_str())))
    });
    funcs.insert("default", |args| {
        if args.is_empty() || args.len() > 2 {
            return Err(invalid("default", "expected a default and an optional value"));
        }
        match args.get(1) {
            Some(value) if value.is_true() => Ok(value.clone()),
            _ => Ok(args[0].clone()),
        }
    });
    funcs.insert("base", |args| {
        let path = unary_str("base", args)?;
        let cleaned = clean_path(&path);
        let base = cleaned
            .rsplit(is_separator)
            .find(|part| !part.is_empty())
            .unwrap_or(cleaned.as_str())
            .to_string();
        Ok(Value::from(base))
    });
    funcs.insert("dir", |args| {
        let path = unary_str("dir", args)?;
        let cleaned = clean_path(&path);
        let dir = match cleaned.rfind(is_separator) {
            Some(0) => MAIN_SEPARATOR_STR.to_string(),
            Some(i) => cleaned[..i].to_string(),
            None => ".".to_string(),
        };
        Ok(Value::from(dir))
    });
    funcs.insert("ext", |args| {
        let path = unary_str("ext", args)?;
        let name = path.rsplit(is_separator).next().unwrap_or("");
        let ext = name.rfind('.').map(|i| &name[i..]).unwrap_or("");
        Ok(Value::from(ext))
    });
    funcs.insert("clean", |args| Ok(Value::from(clean_path(&unary_str("clean", args)?))));

    funcs
}

fn invalid(func: &str, reason: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidOperation, format!("{}: {}", func, reason))
}

fn expect_args(func: &str, args: &[Value], count: usize) -> Result<(), Error> {
    if args.len() == count {
        Ok(())
    } else {
        Err(invalid(
            func,
            format!("expected {} argument(s), got {}", count, args.len()),
        ))
    }
}

fn str_arg(func: &str, args: &[Value], index: usize) -> Result<String, Error> {
    let value = args
        .get(index)
        .ok_or_else(|| invalid(func, format!("missing argument {}", index + 1)))?;
    match value.as_str() {
        Some(s) => Ok(s.to_string()),
        None if value.is_number() || value.kind() == minijinja::value::ValueKind::Bool => {
            Ok(value.to_string())
        }
        None => Err(invalid(func, format!("argument {} must be a string", index + 1))),
    }
}

fn unary_str(func: &str, args: &[Value]) -> Result<String, Error> {
    expect_args(func, args, 1)?;
    str_arg(func, args, 0)
}

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

fn from_slash(path: &str) -> String {
    path.replace('/', MAIN_SEPARATOR_STR)
}

fn to_slash(path: &str) -> String {
    path.replace(MAIN_SEPARATOR, "/")
}

/// Lexically clean a path: drop `.` and empty elements, resolve `..`
/// against preceding elements
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with(is_separator);
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split(is_separator) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join(MAIN_SEPARATOR_STR);
    match (rooted, joined.is_empty()) {
        (true, _) => format!("{}{}", MAIN_SEPARATOR, joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn join_path(elems: &[String]) -> String {
    let non_empty: Vec<&str> = elems
        .iter()
        .map(String::as_str)
        .filter(|e| !e.is_empty())
        .collect();
    if non_empty.is_empty() {
        return String::new();
    }
    clean_path(&non_empty.join(MAIN_SEPARATOR_STR))
}

/// Lexical relative path from `base` to `target`
fn rel_path(base: &str, target: &str) -> Result<String, String> {
    let base = clean_path(base);
    let target = clean_path(target);

    let base_rooted = base.starts_with(is_separator);
    if base_rooted != target.starts_with(is_separator) {
        return Err(format!("can't make {} relative to {}", target, base));
    }

    let split = |p: &str| -> Vec<String> {
        p.split(is_separator)
            .filter(|s| !s.is_empty() && *s != ".")
            .map(String::from)
            .collect()
    };
    let base_parts = split(&base);
    let target_parts = split(&target);

    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(b, t)| b == t)
        .count();

    if base_parts[common..].iter().any(|p| p == "..") {
        return Err(format!("can't make {} relative to {}", target, base));
    }

    let mut rel: Vec<&str> = vec![".."; base_parts.len() - common];
    rel.extend(target_parts[common..].iter().map(String::as_str));

    if rel.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(rel.join(MAIN_SEPARATOR_STR))
    }
}
