//! Prompt templates with `{{variable}}` placeholders, rendered by Handlebars.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use handlebars::Handlebars;
use handlebars::template::{Template, TemplateElement};

use crate::{Error, Result};

/// Variables a chat turn is rendered with.
///
/// A bare string binds to the template's only variable; use
/// [`ChatInput::vars`] for templates with several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Text(String),
    Vars(BTreeMap<String, String>),
}

impl ChatInput {
    pub fn vars<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Vars(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for ChatInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Vars(vars) => {
                let pairs: Vec<_> = vars.iter().map(|(k, v)| format!("{k}={v}")).collect();
                f.write_str(&pairs.join(", "))
            }
        }
    }
}

impl From<&str> for ChatInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ChatInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<BTreeMap<String, String>> for ChatInput {
    fn from(vars: BTreeMap<String, String>) -> Self {
        Self::Vars(vars)
    }
}

static RENDERER: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
});

/// A prompt template in Handlebars syntax.
///
/// `{{name}}` is a placeholder. Output is never HTML-escaped, and rendering
/// fails when a referenced variable is not bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Parse a template string.
    pub fn from_template(template: &str) -> Result<Self> {
        let compiled = Template::compile(template)
            .map_err(|e| Error::Prompt(format!("invalid template: {e}")))?;

        let mut variables: Vec<String> = Vec::new();
        for element in &compiled.elements {
            let (TemplateElement::Expression(expr) | TemplateElement::HtmlExpression(expr)) = element
            else {
                continue;
            };
            if !expr.params.is_empty() || !expr.hash.is_empty() {
                continue;
            }
            let Some(path) = expr.name.as_name() else {
                continue;
            };
            let root = path.split('.').next().unwrap_or(path);
            if root.is_empty() || root.starts_with('@') || root == "this" {
                continue;
            }
            if !variables.iter().any(|v| v == root) {
                variables.push(root.to_string());
            }
        }

        Ok(Self {
            source: template.to_string(),
            variables,
        })
    }

    /// Top-level variable names in order of first appearance.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Substitute every placeholder.
    pub fn render(&self, input: &ChatInput) -> Result<String> {
        let single;
        let vars = match input {
            ChatInput::Vars(vars) => vars,
            ChatInput::Text(text) => match self.variables.as_slice() {
                [only] => {
                    single = BTreeMap::from([(only.clone(), text.clone())]);
                    &single
                }
                other => {
                    return Err(Error::Prompt(format!(
                        "a plain message needs a template with exactly one variable, found {}",
                        other.len()
                    )));
                }
            },
        };

        if let Some(missing) = self.variables.iter().find(|v| !vars.contains_key(*v)) {
            return Err(Error::Prompt(format!("missing variable '{missing}'")));
        }

        RENDERER
            .render_template(&self.source, vars)
            .map_err(|e| Error::Prompt(format!("failed to render template: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_single_variable_from_text() {
        let template = PromptTemplate::from_template("Answer: {{input}}").unwrap();
        assert_eq!(template.variables(), ["input"]);
        assert_eq!(template.render(&"why?".into()).unwrap(), "Answer: why?");
    }

    #[test]
    fn renders_named_variables() {
        let template =
            PromptTemplate::from_template("{{greeting}}, {{name}}! {{greeting}}.").unwrap();
        let input = ChatInput::vars([("greeting", "Hi"), ("name", "Ada")]);
        assert_eq!(template.render(&input).unwrap(), "Hi, Ada! Hi.");
        assert_eq!(template.variables(), ["greeting", "name"]);
    }

    #[test]
    fn single_braces_are_literal() {
        let template = PromptTemplate::from_template("json: {\"q\": {{q}}}").unwrap();
        assert_eq!(template.variables(), ["q"]);
        assert_eq!(template.render(&"x".into()).unwrap(), "json: {\"q\": x}");
    }

    #[test]
    fn output_is_not_html_escaped() {
        let template = PromptTemplate::from_template("Code: {{code}}").unwrap();
        assert_eq!(
            template.render(&"<b>&</b>".into()).unwrap(),
            "Code: <b>&</b>"
        );
    }

    #[test]
    fn missing_variable_fails() {
        let template = PromptTemplate::from_template("{{a}} and {{b}}").unwrap();
        let err = template.render(&ChatInput::vars([("a", "1")])).unwrap_err();
        assert!(matches!(err, Error::Prompt(ref m) if m.contains("'b'")));
    }

    #[test]
    fn plain_text_needs_exactly_one_variable() {
        let none = PromptTemplate::from_template("static").unwrap();
        assert!(none.variables().is_empty());
        assert!(none.render(&"x".into()).is_err());

        let two = PromptTemplate::from_template("{{a}}{{b}}").unwrap();
        assert!(two.render(&"x".into()).is_err());
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!(matches!(
            PromptTemplate::from_template("{{open"),
            Err(Error::Prompt(_))
        ));
        assert!(PromptTemplate::from_template("{{#if a}}never closed").is_err());
    }
}
