//! Value schemas used to validate call arguments and responses.
//!
//! A [`Schema`] describes the expected shape of a JSON value. Coercion is
//! lax: numeric and boolean strings are accepted where numbers or booleans
//! are expected, and integral floats are accepted as integers. Every failure
//! is collected with its location, so one pass reports all offending fields.
//!
//! # Example
//!
//! ```
//! use emissary_core::Schema;
//! use serde_json::json;
//!
//! let user = Schema::record("User")
//!     .field("id", Schema::integer().minimum(1))
//!     .field("name", Schema::string().min_length(1))
//!     .optional_field("email", Schema::string());
//!
//! let value = user.coerce(&json!({"id": "7", "name": "Ann"}), "result").unwrap();
//! assert_eq!(value, json!({"id": 7, "name": "Ann", "email": null}));
//!
//! let errors = user.coerce(&json!({"id": 0}), "result").unwrap_err();
//! assert_eq!(errors.len(), 2);
//! ```

use crate::FieldErrors;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

/// A string pattern, compiled once when declared.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl Pattern {
    /// Compiles `source`. A bad pattern is kept and reported by
    /// [`Schema::check_patterns`].
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&source);
        Self { source, compiled }
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled expression, if the pattern is valid.
    #[must_use]
    pub fn regex(&self) -> Option<&Regex> {
        self.compiled.as_ref().ok()
    }

    /// The compile error, if the pattern is invalid.
    #[must_use]
    pub fn error(&self) -> Option<&regex::Error> {
        self.compiled.as_ref().err()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Expected shape of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A string.
    String {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Regular expression the value must match somewhere.
        pattern: Option<Pattern>,
    },
    /// A signed integer.
    Integer {
        /// Inclusive lower bound.
        minimum: Option<i64>,
        /// Inclusive upper bound.
        maximum: Option<i64>,
    },
    /// A floating point number.
    Number {
        /// Inclusive lower bound.
        minimum: Option<f64>,
        /// Inclusive upper bound.
        maximum: Option<f64>,
    },
    /// A boolean.
    Boolean,
    /// A list of values sharing one schema.
    Array {
        /// Item schema.
        items: Box<Schema>,
        /// Minimum number of items.
        min_items: Option<usize>,
        /// Maximum number of items.
        max_items: Option<usize>,
    },
    /// A named structured record with ordered fields.
    Record {
        /// Record type name.
        name: String,
        /// Field schemas in declaration order.
        fields: IndexMap<String, Schema>,
        /// Names of fields that must be present.
        required: Vec<String>,
    },
    /// A string-keyed mapping with uniform values.
    Map {
        /// Value schema.
        values: Box<Schema>,
    },
    /// The inner schema, or null.
    Optional(Box<Schema>),
    /// Anything.
    Any,
    /// Only null.
    Null,
}

impl Schema {
    /// A string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    /// An integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    /// A number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            minimum: None,
            maximum: None,
        }
    }

    /// A boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean
    }

    /// An array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    /// An empty record schema; add fields with [`Schema::field`].
    #[must_use]
    pub fn record(name: impl Into<String>) -> Self {
        Self::Record {
            name: name.into(),
            fields: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// A mapping schema.
    #[must_use]
    pub fn map(values: Schema) -> Self {
        Self::Map {
            values: Box::new(values),
        }
    }

    /// A schema accepting anything.
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    /// A schema accepting only null.
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Wraps this schema so that null is also accepted.
    #[must_use]
    pub fn optional(self) -> Self {
        match self {
            Self::Optional(_) | Self::Any | Self::Null => self,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Adds a required field to a record schema.
    #[must_use]
    pub fn field(self, name: impl Into<String>, schema: Schema) -> Self {
        self.add_field(name.into(), schema, true)
    }

    /// Adds a nullable field that may be absent from a record schema.
    #[must_use]
    pub fn optional_field(self, name: impl Into<String>, schema: Schema) -> Self {
        self.add_field(name.into(), schema.optional(), false)
    }

    fn add_field(self, name: String, schema: Schema, is_required: bool) -> Self {
        match self {
            Self::Record {
                name: record,
                mut fields,
                mut required,
            } => {
                required.retain(|r| r != &name);
                if is_required {
                    required.push(name.clone());
                }
                fields.insert(name, schema);
                Self::Record {
                    name: record,
                    fields,
                    required,
                }
            }
            other => other,
        }
    }

    /// Sets the minimum length of a string schema.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let Self::String { min_length, .. } = &mut self {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum length of a string schema.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let Self::String { max_length, .. } = &mut self {
            *max_length = Some(len);
        }
        self
    }

    /// Sets the pattern of a string schema.
    #[must_use]
    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        if let Self::String { pattern, .. } = &mut self {
            *pattern = Some(Pattern::new(regex));
        }
        self
    }

    /// Sets the inclusive lower bound of an integer or number schema.
    #[must_use]
    pub fn minimum(mut self, min: i64) -> Self {
        match &mut self {
            Self::Integer { minimum, .. } => *minimum = Some(min),
            Self::Number { minimum, .. } => *minimum = Some(min as f64),
            _ => {}
        }
        self
    }

    /// Sets the inclusive upper bound of an integer or number schema.
    #[must_use]
    pub fn maximum(mut self, max: i64) -> Self {
        match &mut self {
            Self::Integer { maximum, .. } => *maximum = Some(max),
            Self::Number { maximum, .. } => *maximum = Some(max as f64),
            _ => {}
        }
        self
    }

    /// Sets the minimum item count of an array schema.
    #[must_use]
    pub fn min_items(mut self, min: usize) -> Self {
        if let Self::Array { min_items, .. } = &mut self {
            *min_items = Some(min);
        }
        self
    }

    /// Sets the maximum item count of an array schema.
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        if let Self::Array { max_items, .. } = &mut self {
            *max_items = Some(max);
        }
        self
    }

    /// Returns true if null is a valid value.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Optional(_) | Self::Any | Self::Null)
    }

    /// Returns the record name of a record schema.
    #[must_use]
    pub fn record_name(&self) -> Option<&str> {
        match self {
            Self::Record { name, .. } => Some(name),
            Self::Optional(inner) => inner.record_name(),
            _ => None,
        }
    }

    /// Short type description, e.g. `list[User]` or `int | None`.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::String { .. } => "str".to_string(),
            Self::Integer { .. } => "int".to_string(),
            Self::Number { .. } => "float".to_string(),
            Self::Boolean => "bool".to_string(),
            Self::Array { items, .. } => format!("list[{}]", items.type_name()),
            Self::Record { name, .. } => name.clone(),
            Self::Map { values } => format!("dict[str, {}]", values.type_name()),
            Self::Optional(inner) => format!("{} | None", inner.type_name()),
            Self::Any => "Any".to_string(),
            Self::Null => "None".to_string(),
        }
    }

    /// Coerces `value` into this schema, collecting every failure under `loc`.
    pub fn coerce(&self, value: &Value, loc: &str) -> Result<Value, FieldErrors> {
        let mut errors = FieldErrors::new();
        let coerced = self.coerce_at(value, loc, &mut errors);
        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(errors)
        }
    }

    /// Reports every string pattern of this schema, nested ones included,
    /// that failed to compile.
    pub fn check_patterns(&self, loc: &str) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.collect_pattern_errors(loc, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn collect_pattern_errors(&self, loc: &str, errors: &mut FieldErrors) {
        match self {
            Self::String {
                pattern: Some(pattern),
                ..
            } => {
                if let Some(error) = pattern.error() {
                    errors.push(loc, format!("invalid pattern '{}': {error}", pattern.as_str()));
                }
            }
            Self::Array { items, .. } => items.collect_pattern_errors(&format!("{loc}[]"), errors),
            Self::Record { fields, .. } => {
                for (name, schema) in fields {
                    schema.collect_pattern_errors(&join_loc(loc, name), errors);
                }
            }
            Self::Map { values } | Self::Optional(values) => {
                values.collect_pattern_errors(loc, errors);
            }
            _ => {}
        }
    }

    /// Checks `value` against this schema without keeping the coerced value.
    pub fn validate(&self, value: &Value, loc: &str) -> Result<(), FieldErrors> {
        self.coerce(value, loc).map(|_| ())
    }

    /// Coerces one value, appending failures to `errors`.
    ///
    /// On failure the input is returned unchanged so that sibling fields are
    /// still checked.
    pub fn coerce_at(&self, value: &Value, loc: &str, errors: &mut FieldErrors) -> Value {
        if value.is_null() {
            if !self.is_nullable() {
                errors.push(loc, format!("expected {}, got null", self.type_name()));
            }
            return Value::Null;
        }

        match self {
            Self::String {
                min_length,
                max_length,
                pattern,
            } => {
                let Some(s) = value.as_str() else {
                    errors.push(loc, format!("expected string, got {}", value_type_name(value)));
                    return value.clone();
                };
                let len = s.chars().count();
                if let Some(min) = min_length {
                    if len < *min {
                        errors.push(
                            loc,
                            format!("string length {len} is less than minimum {min}"),
                        );
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        errors.push(
                            loc,
                            format!("string length {len} is greater than maximum {max}"),
                        );
                    }
                }
                if let Some(pattern) = pattern {
                    match pattern.regex() {
                        Some(re) if re.is_match(s) => {}
                        Some(_) => errors.push(
                            loc,
                            format!("string does not match '{}'", pattern.as_str()),
                        ),
                        None => errors.push(loc, format!("invalid pattern '{}'", pattern.as_str())),
                    }
                }
                value.clone()
            }

            Self::Integer { minimum, maximum } => {
                let Some(n) = coerce_integer(value) else {
                    errors.push(loc, format!("expected integer, got {}", value_type_name(value)));
                    return value.clone();
                };
                check_bounds(n, *minimum, *maximum, loc, errors);
                Value::from(n)
            }

            Self::Number { minimum, maximum } => {
                let Some(n) = coerce_number(value) else {
                    errors.push(loc, format!("expected number, got {}", value_type_name(value)));
                    return value.clone();
                };
                check_bounds(n, *minimum, *maximum, loc, errors);
                if value.is_number() {
                    value.clone()
                } else {
                    serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
                }
            }

            Self::Boolean => match coerce_bool(value) {
                Some(b) => Value::Bool(b),
                None => {
                    errors.push(loc, format!("expected boolean, got {}", value_type_name(value)));
                    value.clone()
                }
            },

            Self::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(arr) = value.as_array() else {
                    errors.push(loc, format!("expected array, got {}", value_type_name(value)));
                    return value.clone();
                };
                if let Some(min) = min_items {
                    if arr.len() < *min {
                        errors.push(
                            loc,
                            format!("array length {} is less than minimum {min}", arr.len()),
                        );
                    }
                }
                if let Some(max) = max_items {
                    if arr.len() > *max {
                        errors.push(
                            loc,
                            format!("array length {} is greater than maximum {max}", arr.len()),
                        );
                    }
                }
                Value::Array(
                    arr.iter()
                        .enumerate()
                        .map(|(idx, item)| items.coerce_at(item, &format!("{loc}[{idx}]"), errors))
                        .collect(),
                )
            }

            Self::Record {
                fields, required, ..
            } => {
                let Some(obj) = value.as_object() else {
                    errors.push(loc, format!("expected object, got {}", value_type_name(value)));
                    return value.clone();
                };
                let mut out = Map::new();
                for (name, schema) in fields {
                    let field_loc = join_loc(loc, name);
                    match obj.get(name) {
                        Some(v) => {
                            out.insert(name.clone(), schema.coerce_at(v, &field_loc, errors));
                        }
                        None if required.contains(name) => {
                            errors.push(field_loc, "field required");
                        }
                        None => {
                            out.insert(name.clone(), Value::Null);
                        }
                    }
                }
                Value::Object(out)
            }

            Self::Map { values } => {
                let Some(obj) = value.as_object() else {
                    errors.push(loc, format!("expected object, got {}", value_type_name(value)));
                    return value.clone();
                };
                Value::Object(
                    obj.iter()
                        .map(|(k, v)| (k.clone(), values.coerce_at(v, &join_loc(loc, k), errors)))
                        .collect(),
                )
            }

            Self::Optional(inner) => inner.coerce_at(value, loc, errors),

            Self::Any => value.clone(),

            Self::Null => {
                errors.push(loc, format!("expected null, got {}", value_type_name(value)));
                value.clone()
            }
        }
    }
}

fn join_loc(loc: &str, name: &str) -> String {
    if loc.is_empty() {
        name.to_string()
    } else {
        format!("{loc}.{name}")
    }
}

fn check_bounds<T>(n: T, minimum: Option<T>, maximum: Option<T>, loc: &str, errors: &mut FieldErrors)
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if let Some(min) = minimum {
        if n < min {
            errors.push(loc, format!("value {n} is less than minimum {min}"));
        }
    }
    if let Some(max) = maximum {
        if n > max {
            errors.push(loc, format!("value {n} is greater than maximum {max}"));
        }
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Returns a human-readable name for a JSON value type.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
