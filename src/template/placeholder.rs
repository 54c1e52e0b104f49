//! `{{variable}}` substitution templates

use serde_json::Value;

use super::renderable::{RenderError, Renderable};
use super::types::RenderContext;

/// Text template with `{{ name }}` placeholders.
///
/// Placeholder names may contain surrounding whitespace and dotted paths
/// (`{{ user.name }}`, `{{ items.0 }}`). Unknown names render as an empty
/// string unless the template is [`strict`](PlaceholderTemplate::strict).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderTemplate {
    source: String,
    escape_html: bool,
    strict: bool,
}

impl PlaceholderTemplate {
    /// Create a plain-text template
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            escape_html: false,
            strict: false,
        }
    }

    /// Create a template whose substituted values are HTML-escaped
    pub fn html(source: impl Into<String>) -> Self {
        Self {
            escape_html: true,
            ..Self::new(source)
        }
    }

    /// Fail on placeholders that have no matching variable
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// The unrendered template text
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Renderable for PlaceholderTemplate {
    fn render(&self, context: &RenderContext) -> Result<String, RenderError> {
        substitute_string(&self.source, context, self.escape_html, self.strict)
    }
}

impl From<&str> for PlaceholderTemplate {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

fn substitute_string(
    template: &str,
    variables: &RenderContext,
    escape: bool,
    strict: bool,
) -> Result<String, RenderError> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);

        let inner = &rest[start + 2..];
        let end = inner.find("}}").ok_or_else(|| RenderError::Syntax {
            position: offset + start,
            message: "unterminated placeholder".to_string(),
        })?;

        let name = inner[..end].trim();
        if name.is_empty() {
            return Err(RenderError::Syntax {
                position: offset + start,
                message: "empty placeholder".to_string(),
            });
        }
        if name.contains(['{', '}']) {
            return Err(RenderError::Syntax {
                position: offset + start,
                message: format!("invalid placeholder name '{}'", name),
            });
        }

        match lookup(variables, name) {
            Some(value) => {
                let text = format_value(value);
                if escape {
                    result.push_str(&escape_html(&text));
                } else {
                    result.push_str(&text);
                }
            }
            None if strict => return Err(RenderError::MissingVariable(name.to_string())),
            None => {}
        }

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Resolve a dotted path against the context
fn lookup<'a>(variables: &'a RenderContext, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = variables.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // For arrays and objects, use JSON representation
        _ => value.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> RenderContext {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_substitute_simple() {
        let template = PlaceholderTemplate::new("Hello, {{name}}!");
        let rendered = template.render(&context(json!({"name": "World"}))).unwrap();
        assert_eq!(rendered, "Hello, World!");
    }

    #[test]
    fn test_substitute_with_whitespace() {
        let template = PlaceholderTemplate::new("This is a test mail -- {{ test_data }}");
        let rendered = template.render(&context(json!({"test_data": "abc"}))).unwrap();
        assert_eq!(rendered, "This is a test mail -- abc");
    }

    #[test]
    fn test_substitute_multiple() {
        let template =
            PlaceholderTemplate::new("Your order {{order_id}} is being delivered by {{carrier}}");
        let rendered = template
            .render(&context(json!({"order_id": "ORD-123", "carrier": "FedEx"})))
            .unwrap();
        assert_eq!(rendered, "Your order ORD-123 is being delivered by FedEx");
    }

    #[test]
    fn test_substitute_nested_path() {
        let template = PlaceholderTemplate::new("Hello {{ user.name }}, first item: {{items.0}}");
        let rendered = template
            .render(&context(json!({
                "user": {"name": "Alice"},
                "items": ["book", "pen"]
            })))
            .unwrap();
        assert_eq!(rendered, "Hello Alice, first item: book");
    }

    #[test]
    fn test_substitute_number_and_bool() {
        let template = PlaceholderTemplate::new("You have {{count}} items ({{vip}})");
        let rendered = template
            .render(&context(json!({"count": 42, "vip": true})))
            .unwrap();
        assert_eq!(rendered, "You have 42 items (true)");
    }

    #[test]
    fn test_missing_variable_is_empty_by_default() {
        let template = PlaceholderTemplate::new("Hi {{name}}!");
        let rendered = template.render(&RenderContext::new()).unwrap();
        assert_eq!(rendered, "Hi !");
    }

    #[test]
    fn test_missing_variable_strict() {
        let template = PlaceholderTemplate::new("Hi {{name}}!").strict();
        let result = template.render(&RenderContext::new());
        assert!(matches!(result, Err(RenderError::MissingVariable(name)) if name == "name"));
    }

    #[test]
    fn test_null_is_not_missing_in_strict_mode() {
        let template = PlaceholderTemplate::new("[{{note}}]").strict();
        let rendered = template.render(&context(json!({"note": null}))).unwrap();
        assert_eq!(rendered, "[]");
    }

    #[test]
    fn test_unterminated_placeholder() {
        let template = PlaceholderTemplate::new("Hi {{name");
        let result = template.render(&RenderContext::new());
        assert!(matches!(result, Err(RenderError::Syntax { position: 3, .. })));
    }

    #[test]
    fn test_braces_in_placeholder_name() {
        let ctx = context(json!({"name": "Ada"}));

        let result = PlaceholderTemplate::new("Hi {{{name}}}").render(&ctx);
        assert!(matches!(result, Err(RenderError::Syntax { position: 3, .. })));

        let result = PlaceholderTemplate::new("{{ a {{ name }}").render(&ctx);
        assert!(matches!(result, Err(RenderError::Syntax { position: 0, .. })));
    }

    #[test]
    fn test_html_escaping() {
        let template = PlaceholderTemplate::html("<b>{{name}}</b>");
        let rendered = template
            .render(&context(json!({"name": "<script>\"x\" & 'y'</script>"})))
            .unwrap();
        assert_eq!(
            rendered,
            "<b>&lt;script&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/script&gt;</b>"
        );
    }

    #[test]
    fn test_source_is_untouched_by_render() {
        let template = PlaceholderTemplate::new("Hi {{name}}");
        template.render(&context(json!({"name": "Ada"}))).unwrap();
        assert_eq!(template.source(), "Hi {{name}}");
    }
}
