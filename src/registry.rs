//! Annotation kind → open/close markup rules.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::annotation::Payload;

/// One side (open or close) of a [`RenderRule`].
#[derive(Clone)]
pub enum Markup {
    /// Fixed markup, independent of the annotation's payload.
    Literal(String),
    /// Markup computed from the annotation's payload.
    Computed(Arc<dyn Fn(&Payload) -> String + Send + Sync>),
}

impl Markup {
    pub fn literal(markup: impl Into<String>) -> Self {
        Markup::Literal(markup.into())
    }

    pub fn computed(f: impl Fn(&Payload) -> String + Send + Sync + 'static) -> Self {
        Markup::Computed(Arc::new(f))
    }

    /// Markup filled in from payload fields.
    ///
    /// `{name}` is replaced by the payload's `name` field, `{}` by the
    /// payload itself. Strings are inserted verbatim, other values as JSON,
    /// missing values as nothing. `{{` and `}}` produce literal braces.
    pub fn template(template: impl Into<String>) -> Self {
        let template = template.into();
        Markup::computed(move |payload| fill_template(&template, payload))
    }

    /// The markup text for an annotation carrying `payload`.
    pub fn resolve(&self, payload: &Payload) -> Cow<'_, str> {
        match self {
            Markup::Literal(markup) => Cow::Borrowed(markup.as_str()),
            Markup::Computed(f) => Cow::Owned(f(payload)),
        }
    }
}

impl fmt::Debug for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::Literal(markup) => f.debug_tuple("Literal").field(markup).finish(),
            Markup::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Markup {
    fn from(markup: &str) -> Self {
        Markup::literal(markup)
    }
}

impl From<String> for Markup {
    fn from(markup: String) -> Self {
        Markup::Literal(markup)
    }
}

fn fill_template(template: &str, payload: &Payload) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    // Unterminated placeholder, keep it as written
                    out.push('{');
                    out.push_str(&name);
                    continue;
                }
                let value = if name.is_empty() {
                    Some(payload)
                } else {
                    payload.get(name.as_str())
                };
                push_value(value, &mut out);
            }
            _ => out.push(ch),
        }
    }

    out
}

fn push_value(value: Option<&Payload>, out: &mut String) {
    match value {
        None | Some(Payload::Null) => {}
        Some(Payload::String(s)) => out.push_str(s),
        Some(other) => out.push_str(&other.to_string()),
    }
}

/// Open and close markup for one annotation kind.
#[derive(Debug, Clone)]
pub struct RenderRule {
    pub open: Markup,
    pub close: Markup,
}

impl RenderRule {
    pub fn new(open: impl Into<Markup>, close: impl Into<Markup>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Rendering rules keyed by annotation kind.
///
/// Kinds without a rule are ignored by the renderer: they add no markup
/// and the characters they cover render as usual.
#[derive(Debug, Clone, Default)]
pub struct AnnotationRegistry {
    rules: HashMap<String, RenderRule>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` for `kind`, replacing any existing rule.
    pub fn register(&mut self, kind: impl Into<String>, rule: RenderRule) {
        self.rules.insert(kind.into(), rule);
    }

    pub fn with_rule(mut self, kind: impl Into<String>, rule: RenderRule) -> Self {
        self.register(kind, rule);
        self
    }

    pub fn get(&self, kind: &str) -> Option<&RenderRule> {
        self.rules.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.rules.contains_key(kind)
    }
}
