//! Template expansion for task definitions
//!
//! Command strings, directories, variable values and output messages are
//! rendered with minijinja before use. Variables are exposed by name
//! (`{{ NAME }}`) and the functions of the [`funcs`] registry are callable
//! (`{{ OS() }}`, `{{ joinPath(ROOT_DIR, "bin") }}`).

pub mod funcs;

pub use funcs::{template_funcs, FuncMap, TemplateFunc};

use crate::error::{ExecutionError, ExecutionResult};
use minijinja::syntax::SyntaxConfig;
use minijinja::value::Rest;
use minijinja::{Environment, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Comment delimiters; the default `{#` collides with shell `${#VAR}`
const COMMENT_START: &str = "{/*";
const COMMENT_END: &str = "*/}";

/// Resolved variables a template is rendered against
pub type TemplateVars = BTreeMap<String, String>;

/// Renders templates with the process-wide function registry installed
pub struct Templater {
    env: Environment<'static>,
}

impl Templater {
    /// Create a templater using the process-wide registry
    pub fn new() -> Self {
        Self::with_funcs(template_funcs())
    }

    /// Create a templater with an explicit function map
    pub fn with_funcs(funcs: &FuncMap) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        if let Ok(syntax) = shell_safe_syntax() {
            env.set_syntax(syntax);
        }

        for (name, func) in funcs.iter() {
            let func = Arc::clone(func);
            env.add_function(name, move |args: Rest<Value>| func(&args.0));
        }

        Templater { env }
    }

    /// Render `template`; strings without template syntax are returned as is
    pub fn render(&self, template: &str, vars: &TemplateVars) -> ExecutionResult<String> {
        if !template.contains("{{") && !template.contains("{%") {
            return Ok(template.to_string());
        }

        self.env
            .render_str(template, vars)
            .map_err(|e| ExecutionError::Template {
                template: template.to_string(),
                reason: e.to_string(),
            })
    }

    /// Render every string of a list
    pub fn render_list(&self, list: &[String], vars: &TemplateVars) -> ExecutionResult<Vec<String>> {
        list.iter().map(|s| self.render(s, vars)).collect()
    }
}

fn shell_safe_syntax() -> Result<SyntaxConfig, minijinja::Error> {
    SyntaxConfig::builder()
        .block_delimiters("{%", "%}")
        .variable_delimiters("{{", "}}")
        .comment_delimiters(COMMENT_START, COMMENT_END)
        .build()
}

impl Default for Templater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_interpolation() {
        let templater = Templater::new();
        let result = templater
            .render("Hello, {{ name }}!", &vars(&[("name", "world")]))
            .unwrap();
        assert_eq!(result, "Hello, world!");
    }

    #[test]
    fn test_registry_functions_are_callable() {
        let templater = Templater::new();
        let result = templater.render("{{ OS() }}/{{ ARCH() }}", &TemplateVars::new()).unwrap();
        assert_eq!(
            result,
            format!("{}/{}", funcs::os_name(), funcs::arch_name())
        );

        let result = templater
            .render("echo {{ shellQuote(MSG) }}", &vars(&[("MSG", "a b")]))
            .unwrap();
        assert_eq!(
            shlex::split(&result),
            Some(vec!["echo".to_string(), "a b".to_string()])
        );
    }

    #[test]
    fn test_no_template_syntax_passes_through() {
        let templater = Templater::new();
        let result = templater.render("echo $HOME ${X}", &TemplateVars::new()).unwrap();
        assert_eq!(result, "echo $HOME ${X}");
    }

    #[test]
    fn test_shell_syntax_next_to_templates() {
        let templater = Templater::new();
        let vars = vars(&[("NAME", "abc")]);

        let result = templater.render("X={{ NAME }}; echo ${#X}", &vars).unwrap();
        assert_eq!(result, "X=abc; echo ${#X}");

        let result = templater
            .render("f() { echo {{ NAME }}; }; echo {a,b} {#} ${X:-y}", &vars)
            .unwrap();
        assert_eq!(result, "f() { echo abc; }; echo {a,b} {#} ${X:-y}");
    }

    #[test]
    fn test_comments_use_shell_safe_delimiters() {
        let templater = Templater::new();
        let result = templater
            .render("echo {/* note */}{{ NAME }}", &vars(&[("NAME", "x")]))
            .unwrap();
        assert_eq!(result, "echo x");
    }

    #[test]
    fn test_undefined_variable_is_empty() {
        let templater = Templater::new();
        let result = templater.render("[{{ missing }}]", &TemplateVars::new()).unwrap();
        assert_eq!(result, "[]");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let templater = Templater::new();
        let result = templater.render("{{ unclosed", &TemplateVars::new());
        assert!(matches!(result, Err(ExecutionError::Template { .. })));
    }

    #[test]
    fn test_custom_function_map() {
        let mut funcs = FuncMap::new();
        funcs.insert("answer", |_| Ok(Value::from(42)));
        let templater = Templater::with_funcs(&funcs);
        assert_eq!(
            templater.render("{{ answer() }}", &TemplateVars::new()).unwrap(),
            "42"
        );
    }

    #[test]
    fn test_render_list() {
        let templater = Templater::new();
        let list = vec!["src/{{ PKG }}/*.rs".to_string(), "Cargo.toml".to_string()];
        let rendered = templater.render_list(&list, &vars(&[("PKG", "core")])).unwrap();
        assert_eq!(rendered, vec!["src/core/*.rs", "Cargo.toml"]);
    }
}
