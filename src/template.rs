use derive_more::{Display, Error};
use minijinja::{Environment, ErrorKind, Output, State, UndefinedBehavior, Value};
use std::fmt::Write;
use std::sync::Arc;

#[derive(Debug, Display, Error)]
pub enum TemplateError {
    #[display("{_0}")]
    Syntax(minijinja::Error),
    #[display("{_0}")]
    Render(minijinja::Error),
    #[display("Template rendered an empty path")]
    EmptyPath,
}

/// Lowercase, dash separated, ASCII only.
pub fn slugify(input: &str) -> String {
    let ascii = deunicode::deunicode(input);
    let mut out = String::with_capacity(ascii.len());
    let mut prev_dash = false;
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash && !out.is_empty() {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn slugify_filter(value: String) -> String {
    slugify(&value)
}

/// Every printed expression ends up as a slug, so rendered templates only
/// contain path-safe segments. Literal template text is written as is.
fn url_formatter(out: &mut Output<'_>, _: &State<'_, '_>, value: &Value) -> Result<(), minijinja::Error> {
    if value.is_undefined() {
        return Err(minijinja::Error::from(ErrorKind::UndefinedError));
    }
    if value.is_none() {
        return Ok(());
    }
    let written = if value.is_safe() {
        write!(out, "{value}")
    } else {
        out.write_str(&slugify(&value.to_string()))
    };
    written.map_err(|_| minijinja::Error::new(ErrorKind::WriteFailure, "Unable to write seo url"))
}

fn url_environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_filter("slugify", slugify_filter);
    env.set_formatter(url_formatter);
    env
}

/// Compiles and renders seo url templates.
///
/// Templates are compiled from source on every use. Administrators rewrite them
/// often and a stale compiled template would produce wrong paths.
#[derive(Clone)]
pub struct SeoUrlTemplateRenderer {
    env: Arc<Environment<'static>>,
}

impl Default for SeoUrlTemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SeoUrlTemplateRenderer {
    pub fn new() -> Self {
        Self {
            env: Arc::new(url_environment()),
        }
    }

    pub fn compile<S: Into<String>>(&self, source: S) -> Result<UrlTemplate, TemplateError> {
        let source = source.into();
        // parsed templates borrow their source, so syntax is checked in a scratch environment
        let scratch = url_environment();
        scratch
            .template_from_str(&source)
            .map_err(TemplateError::Syntax)?;
        Ok(UrlTemplate {
            source,
            env: self.env.clone(),
        })
    }
}

/// Template that passed syntax validation.
#[derive(Clone)]
pub struct UrlTemplate {
    source: String,
    env: Arc<Environment<'static>>,
}

impl std::fmt::Debug for UrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlTemplate")
            .field("source", &self.source)
            .finish()
    }
}

impl UrlTemplate {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the seo path for one entity context, without leading slash.
    pub fn render(&self, context: &serde_json::Value) -> Result<String, TemplateError> {
        let rendered = self
            .env
            .render_str(&self.source, context)
            .map_err(TemplateError::Render)?;
        let path = rendered.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(TemplateError::EmptyPath);
        }
        Ok(path.to_string())
    }
}

/// Dotted names of every value reachable in a template context.
pub fn context_variables(context: &serde_json::Value) -> Vec<String> {
    fn collect(prefix: &str, value: &serde_json::Value, out: &mut Vec<String>) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let name = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    collect(&name, value, out);
                }
            }
            _ if !prefix.is_empty() => out.push(prefix.to_string()),
            _ => (),
        }
    }
    let mut out = vec![];
    collect("", context, &mut out);
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Wireless Headphones!"), "wireless-headphones");
        assert_eq!(slugify("  Multiple   spaces -- here "), "multiple-spaces-here");
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("SW10001"), "sw10001");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn renders_product_template() {
        let renderer = SeoUrlTemplateRenderer::new();
        let template = renderer
            .compile("{{ product.name }}/{{ product.productNumber }}")
            .unwrap();
        let context = json!({"product": {"name": "Wireless Headphones", "productNumber": "SW10001"}});
        assert_eq!(
            template.render(&context).unwrap(),
            "wireless-headphones/sw10001"
        );
    }

    #[test]
    fn renders_breadcrumb_loop() {
        let renderer = SeoUrlTemplateRenderer::new();
        let template = renderer
            .compile("{% for part in breadcrumb %}{{ part }}/{% endfor %}")
            .unwrap();
        let context = json!({"breadcrumb": ["Audio & Video", "Head/phones"]});
        assert_eq!(template.render(&context).unwrap(), "audio-video/head-phones/");
    }

    #[test]
    fn slugify_filter_is_available() {
        let renderer = SeoUrlTemplateRenderer::new();
        let template = renderer.compile("{{ name|slugify }}").unwrap();
        assert_eq!(
            template.render(&json!({"name": "Über Größe"})).unwrap(),
            "uber-grosse"
        );
    }

    #[test]
    fn undefined_variable_fails_instead_of_rendering_empty() {
        let renderer = SeoUrlTemplateRenderer::new();
        let template = renderer.compile("{{ product.missing }}/x").unwrap();
        let err = template
            .render(&json!({"product": {"name": "Shoes"}}))
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));

        let template = renderer.compile("{{ nothing }}").unwrap();
        assert!(matches!(
            template.render(&json!({})),
            Err(TemplateError::Render(_))
        ));
    }

    #[test]
    fn syntax_error_is_reported_on_compile() {
        let renderer = SeoUrlTemplateRenderer::new();
        let err = renderer.compile("{{ product.name ").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn empty_render_is_rejected() {
        let renderer = SeoUrlTemplateRenderer::new();
        let template = renderer.compile("{{ name }}").unwrap();
        assert!(matches!(
            template.render(&json!({"name": "!!"})),
            Err(TemplateError::EmptyPath)
        ));
    }

    #[test]
    fn collects_context_variables() {
        let context = json!({
            "product": {"name": "Shoes", "productNumber": "SW1", "tags": ["a"]},
            "breadcrumb": ["Main"]
        });
        assert_eq!(
            context_variables(&context),
            vec![
                "breadcrumb",
                "product.name",
                "product.productNumber",
                "product.tags"
            ]
        );
    }
}
