//! URL templates with `{name}` placeholders.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}/]+)\}").expect("valid regex"))
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Text copied verbatim.
    Literal(String),
    /// A `{name}` placeholder.
    Placeholder(String),
}

/// A parsed URL template such as `/users/{id}/posts`.
///
/// # Example
///
/// ```
/// use emissary_core::PathTemplate;
/// use serde_json::json;
///
/// let template = PathTemplate::parse("/users/{id}/posts/{post_id}");
/// assert_eq!(template.placeholders(), vec!["id", "post_id"]);
///
/// let values = json!({"id": 1}).as_object().cloned().unwrap();
/// assert_eq!(template.format(&values), "/users/1/posts/{post_id}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<PathSegment>,
}

impl PathTemplate {
    /// Parses a template.
    #[must_use]
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;
        for captures in placeholder_regex().captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(PathSegment::Literal(template[last..whole.start()].to_string()));
            }
            segments.push(PathSegment::Placeholder(name.as_str().to_string()));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(PathSegment::Literal(template[last..].to_string()));
        }
        Self {
            raw: template.to_string(),
            segments,
        }
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Placeholder(name) => Some(name.as_str()),
                PathSegment::Literal(_) => None,
            })
            .collect()
    }

    /// Returns true if `name` appears as a placeholder.
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().contains(&name)
    }

    /// Substitutes the placeholders found in `values`, leaving the others in place.
    ///
    /// Substituted values are percent-encoded as path segments.
    pub fn format(&self, values: &Map<String, Value>) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                PathSegment::Literal(text) => out.push_str(text),
                PathSegment::Placeholder(name) => match values.get(name) {
                    Some(value) => out.push_str(&segment_value(value)),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

/// Placeholder names still present in `url`.
pub fn placeholders(url: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(url)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Renders a scalar as one percent-encoded path segment.
pub fn segment_value(value: &Value) -> String {
    urlencoding::encode(&value_to_string(value)).into_owned()
}

/// Renders a scalar the way it appears in URLs, headers and query strings.
///
/// Strings are used as-is, null renders empty and other values use their
/// JSON text.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
