//! Parameter markers.
//!
//! A [`Param`] tags one routed-function parameter with the request channel it
//! belongs to, plus an optional alias, default and value constraints.
//!
//! | Marker | Channel | Default media type |
//! |---|---|---|
//! | [`Param::path`] | URL template | - |
//! | [`Param::query`] | query string | - |
//! | [`Param::header`] | headers | - |
//! | [`Param::cookie`] | cookies | - |
//! | [`Param::body`] | body | `application/json` |
//! | [`Param::form`] | body | `application/x-www-form-urlencoded` |
//! | [`Param::file`] | body | `multipart/form-data` |

use crate::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// `application/json`
pub const JSON: &str = "application/json";
/// `multipart/form-data`
pub const MULTIPART: &str = "multipart/form-data";
/// `application/x-www-form-urlencoded`
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Which channel a marker targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Substituted into the URL template.
    Path,
    /// Query string.
    Query,
    /// Request header.
    Header,
    /// Request cookie.
    Cookie,
    /// Body, JSON by default.
    Body,
    /// Form body.
    Form,
    /// File upload.
    File,
}

impl ParamKind {
    /// Body, Form and File markers carry a media type and an embed flag.
    #[must_use]
    pub const fn is_body(self) -> bool {
        matches!(self, Self::Body | Self::Form | Self::File)
    }

    /// Media type given to new markers of this kind.
    #[must_use]
    pub const fn default_media_type(self) -> Option<&'static str> {
        match self {
            Self::Body => Some(JSON),
            Self::Form => Some(FORM_URLENCODED),
            Self::File => Some(MULTIPART),
            _ => None,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "Path",
            Self::Query => "Query",
            Self::Header => "Header",
            Self::Cookie => "Cookie",
            Self::Body => "Body",
            Self::Form => "Form",
            Self::File => "File",
        };
        f.write_str(name)
    }
}

/// A parameter marker.
///
/// Markers are built once, when a route is declared, and never change
/// afterwards.
///
/// # Example
///
/// ```
/// use emissary_core::{Param, ParamKind, Schema};
///
/// let id = Param::path(Schema::integer().minimum(1));
/// assert!(id.is_required());
///
/// let extra = Param::body(Schema::any()).alias("Extra-Data");
/// assert_eq!(extra.kind(), ParamKind::Body);
/// assert!(extra.is_embed());
/// assert_eq!(extra.media_type_name(), Some("application/json"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    kind: ParamKind,
    schema: Schema,
    alias: Option<String>,
    default: Option<Value>,
    embed: bool,
    media_type: Option<String>,
}

impl Param {
    fn new(kind: ParamKind, schema: Schema) -> Self {
        Self {
            kind,
            schema,
            alias: None,
            default: None,
            embed: true,
            media_type: kind.default_media_type().map(str::to_string),
        }
    }

    /// A path marker. Path markers are always required.
    #[must_use]
    pub fn path(schema: Schema) -> Self {
        Self::new(ParamKind::Path, schema)
    }

    /// A query marker.
    #[must_use]
    pub fn query(schema: Schema) -> Self {
        Self::new(ParamKind::Query, schema)
    }

    /// A header marker.
    #[must_use]
    pub fn header(schema: Schema) -> Self {
        Self::new(ParamKind::Header, schema)
    }

    /// A cookie marker.
    #[must_use]
    pub fn cookie(schema: Schema) -> Self {
        Self::new(ParamKind::Cookie, schema)
    }

    /// A JSON body marker.
    #[must_use]
    pub fn body(schema: Schema) -> Self {
        Self::new(ParamKind::Body, schema)
    }

    /// A form body marker.
    #[must_use]
    pub fn form(schema: Schema) -> Self {
        Self::new(ParamKind::Form, schema)
    }

    /// A file marker.
    #[must_use]
    pub fn file(schema: Schema) -> Self {
        Self::new(ParamKind::File, schema)
    }

    /// Sets the outgoing name, bypassing case conversion.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the value used when the argument is omitted.
    ///
    /// Ignored for path markers, which stay required; route construction
    /// rejects such declarations.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Makes the parameter optional with a null default.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.schema = self.schema.optional();
        self.default = Some(Value::Null);
        self
    }

    /// Sets the embed flag of a body-like marker.
    #[must_use]
    pub fn embed(mut self, embed: bool) -> Self {
        if self.kind.is_body() {
            self.embed = embed;
        }
        self
    }

    /// Sets the media type of a body-like marker.
    #[must_use]
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        if self.kind.is_body() {
            self.media_type = Some(media_type.into());
        }
        self
    }

    /// Marker kind.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Value schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Explicit alias.
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Default value, never set for path markers.
    pub fn default_value(&self) -> Option<&Value> {
        match self.kind {
            ParamKind::Path => None,
            _ => self.default.as_ref(),
        }
    }

    /// Returns true if a default was declared, even where it is not honoured.
    pub fn declares_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns true if the argument must be passed.
    pub fn is_required(&self) -> bool {
        self.default_value().is_none()
    }

    /// Embed flag; always true for non-body markers.
    pub fn is_embed(&self) -> bool {
        self.embed
    }

    /// Media type of body-like markers.
    #[must_use]
    pub fn media_type_name(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}
