//! HTML post-processing for `text/html` alternatives.
//!
//! Mail clients ignore most `<style>` blocks, so rules are moved into the
//! `style` attribute of every matching element before sending.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::template::RenderError;

lazy_static! {
    static ref STYLE_BLOCK: Regex = Regex::new(r"(?is)<style[^>]*>(.*?)</style\s*>").unwrap();
    static ref OPEN_TAG: Regex = Regex::new(
        r#"<([a-zA-Z][a-zA-Z0-9-]*)((?:\s+[^\s"'<>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'<>]+))?)*)\s*(/?)>"#
    ).unwrap();
    static ref ATTRIBUTE: Regex = Regex::new(
        r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'<>]+))"#
    ).unwrap();
    /// Sections whose content is not markup
    static ref RAW_SECTION: Regex = Regex::new(
        r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<textarea\b.*?</textarea\s*>"
    ).unwrap();
    static ref CSS_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
}

/// Post-processor applied to rendered HTML alternatives
pub trait HtmlTransform: Send + Sync {
    fn transform(&self, html: &str) -> Result<String, RenderError>;
}

/// Leaves HTML untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl HtmlTransform for Passthrough {
    fn transform(&self, html: &str) -> Result<String, RenderError> {
        Ok(html.to_string())
    }
}

/// Inlines `<style>` rules into element `style` attributes.
///
/// Supported selectors are `tag`, `.class`, `#id` and compounds such as
/// `p.note`. Rules that cannot be inlined (at-rules, pseudo classes,
/// combinators) stay in a `<style>` block. Declarations already present in
/// a `style` attribute take precedence over stylesheet rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleInliner;

impl HtmlTransform for StyleInliner {
    fn transform(&self, html: &str) -> Result<String, RenderError> {
        if !STYLE_BLOCK.is_match(html) {
            return Ok(html.to_string());
        }

        let stylesheet = STYLE_BLOCK
            .captures_iter(html)
            .map(|caps| caps[1].to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let (rules, residual) = parse_stylesheet(&stylesheet)?;

        let mut first = true;
        let without_styles = STYLE_BLOCK.replace_all(html, |_: &Captures| {
            if std::mem::take(&mut first) && !residual.is_empty() {
                format!("<style type=\"text/css\">{}</style>", residual)
            } else {
                String::new()
            }
        });

        if rules.is_empty() {
            return Ok(without_styles.into_owned());
        }

        Ok(inline_outside_raw(&without_styles, &rules))
    }
}

/// Rewrite opening tags, leaving comments, scripts and style blocks alone
fn inline_outside_raw(html: &str, rules: &[Rule]) -> String {
    let rewrite = |caps: &Captures| {
        inline_tag(&caps[1], &caps[2], &caps[3], rules).unwrap_or_else(|| caps[0].to_string())
    };

    let mut inlined = String::with_capacity(html.len());
    let mut last = 0;
    for raw in RAW_SECTION.find_iter(html) {
        inlined.push_str(&OPEN_TAG.replace_all(&html[last..raw.start()], &rewrite));
        inlined.push_str(raw.as_str());
        last = raw.end();
    }
    inlined.push_str(&OPEN_TAG.replace_all(&html[last..], &rewrite));

    inlined
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty()
            || text
                .chars()
                .any(|c| c.is_whitespace() || ">+~:[*@(),".contains(c))
        {
            return None;
        }

        let mut selector = Selector {
            tag: None,
            id: None,
            classes: Vec::new(),
        };

        let tag_end = text.find(['.', '#']).unwrap_or(text.len());
        if tag_end > 0 {
            selector.tag = Some(text[..tag_end].to_ascii_lowercase());
        }

        let mut rest = &text[tag_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match marker {
                '.' => selector.classes.push(name.to_string()),
                '#' if selector.id.is_none() => selector.id = Some(name.to_string()),
                _ => return None,
            }
            rest = &body[end..];
        }

        Some(selector)
    }

    fn specificity(&self) -> (usize, usize, usize) {
        (
            usize::from(self.id.is_some()),
            self.classes.len(),
            usize::from(self.tag.is_some()),
        )
    }

    fn matches(&self, tag: &str, id: Option<&str>, classes: &[&str]) -> bool {
        self.tag.as_deref().map_or(true, |t| t.eq_ignore_ascii_case(tag))
            && self.id.as_deref().map_or(true, |wanted| id == Some(wanted))
            && self.classes.iter().all(|c| classes.contains(&c.as_str()))
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    order: usize,
    declarations: Vec<(String, String)>,
}

/// Split a stylesheet into inlinable rules and the CSS that has to stay
fn parse_stylesheet(css: &str) -> Result<(Vec<Rule>, String), RenderError> {
    let css = CSS_COMMENT.replace_all(css, "");
    let mut rules = Vec::new();
    let mut residual = String::new();
    let mut rest: &str = &css;

    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let close = matching_brace(rest, open).ok_or_else(|| {
            RenderError::Transform("unbalanced braces in stylesheet".to_string())
        })?;
        let block = &rest[open + 1..close];

        if prelude.starts_with('@') {
            residual.push_str(&format!("{}{{{}}}", prelude, block));
        } else {
            let declarations = parse_declarations(block);
            for text in prelude.split(',') {
                match Selector::parse(text) {
                    Some(selector) => rules.push(Rule {
                        selector,
                        order: rules.len(),
                        declarations: declarations.clone(),
                    }),
                    None => residual.push_str(&format!("{}{{{}}}", text.trim(), block.trim())),
                }
            }
        }

        rest = &rest[close + 1..];
    }

    if rest.contains('}') {
        return Err(RenderError::Transform(
            "unbalanced braces in stylesheet".to_string(),
        ));
    }

    Ok((rules, residual))
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().replace('"', "'");
            (!name.is_empty() && !value.is_empty()).then_some((name, value))
        })
        .collect()
}

fn set_declaration(target: &mut Vec<(String, String)>, name: String, value: String) {
    target.retain(|(existing, _)| *existing != name);
    target.push((name, value));
}

/// Rewrite one opening tag, or `None` when no rule applies
fn inline_tag(tag: &str, attrs: &str, self_closing: &str, rules: &[Rule]) -> Option<String> {
    let mut id = None;
    let mut classes = Vec::new();
    let mut inline_style = None;

    for caps in ATTRIBUTE.captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        match caps[1].to_ascii_lowercase().as_str() {
            "id" => id = Some(value),
            "class" => classes.extend(value.split_whitespace()),
            "style" => inline_style = Some(value),
            _ => {}
        }
    }

    let mut matched: Vec<&Rule> = rules
        .iter()
        .filter(|rule| rule.selector.matches(tag, id, &classes))
        .collect();

    if matched.is_empty() {
        return None;
    }

    matched.sort_by_key(|rule| (rule.selector.specificity(), rule.order));

    let mut declarations = Vec::new();
    for rule in matched {
        for (name, value) in &rule.declarations {
            set_declaration(&mut declarations, name.clone(), value.clone());
        }
    }
    for (name, value) in parse_declarations(inline_style.unwrap_or_default()) {
        set_declaration(&mut declarations, name, value);
    }

    let style = declarations
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("; ");

    let other_attrs = ATTRIBUTE.replace_all(attrs, |caps: &Captures| {
        if caps[1].eq_ignore_ascii_case("style") {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    let other_attrs = other_attrs.trim_end();

    Some(format!(
        "<{}{} style=\"{}\"{}>",
        tag,
        other_attrs,
        style,
        if self_closing.is_empty() { "" } else { " /" }
    ))
}
