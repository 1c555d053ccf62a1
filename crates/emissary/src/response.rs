//! Decorated responses and resolved response values.

use crate::hooks::JsonFinalizer;
use bytes::Bytes;
use emissary_client::Response;
use emissary_core::{CaseConverter, EmissaryError, Result};
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A raw response seen through the route's response case and JSON finalizer.
///
/// Response finalizers receive this instead of the transport's [`Response`].
///
/// # Example
///
/// ```
/// use emissary::{DecoratedResponse, JsonFinalizer};
/// use emissary_client::Response;
/// use emissary_core::CaseConverter;
/// use http::{HeaderMap, StatusCode};
/// use serde_json::json;
///
/// let raw = Response::new(StatusCode::OK, HeaderMap::new(), r#"{"userId":1}"#, "/users/1");
/// let response = DecoratedResponse::new(raw, CaseConverter::snake(), JsonFinalizer::identity());
/// assert_eq!(response.json().unwrap(), json!({"user_id": 1}));
/// ```
#[derive(Debug, Clone)]
pub struct DecoratedResponse {
    inner: Response,
    response_case: CaseConverter,
    json_finalizer: JsonFinalizer,
}

impl DecoratedResponse {
    /// Wraps a raw response.
    #[must_use]
    pub const fn new(
        inner: Response,
        response_case: CaseConverter,
        json_finalizer: JsonFinalizer,
    ) -> Self {
        Self {
            inner,
            response_case,
            json_finalizer,
        }
    }

    /// Decoded body with top-level keys case-converted, then finalized.
    ///
    /// Arrays have the top-level keys of each object element converted.
    pub fn json(&self) -> Result<Value> {
        let value = convert_keys(self.inner.json()?, &self.response_case);
        self.json_finalizer.call(value)
    }

    /// Body as text.
    #[must_use]
    pub fn text(&self) -> String {
        self.inner.text()
    }

    /// Raw body bytes.
    #[must_use]
    pub fn content(&self) -> &Bytes {
        self.inner.content()
    }

    /// Status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.inner.status_code()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Headers as a JSON mapping.
    #[must_use]
    pub fn headers_map(&self) -> Map<String, Value> {
        self.inner.headers_map()
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        self.inner.url()
    }

    /// The undecorated response.
    #[must_use]
    pub const fn raw(&self) -> &Response {
        &self.inner
    }
}

fn convert_keys(value: Value, converter: &CaseConverter) -> Value {
    if converter.is_identity() {
        return value;
    }
    match value {
        Value::Object(map) => Value::Object(convert_map(map, converter)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(convert_map(map, converter)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn convert_map(map: Map<String, Value>, converter: &CaseConverter) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (converter.convert(&key), value))
        .collect()
}

/// The value a route call resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    /// One validated record.
    Record(Value),
    /// Body text.
    Text(String),
    /// A JSON mapping.
    Json(Value),
    /// Raw body.
    Bytes(Bytes),
    /// Validated records.
    Records(Vec<Value>),
    /// JSON mappings.
    JsonList(Vec<Value>),
    /// Response headers of a HEAD or OPTIONS call.
    Headers(Map<String, Value>),
    /// No value.
    None,
    /// Whatever a response finalizer produced.
    Custom(Value),
}

impl ResponseValue {
    /// Returns true for [`ResponseValue::None`].
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The text of a [`ResponseValue::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The body of a [`ResponseValue::Bytes`].
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Converts into a JSON value. Bytes become an array of numbers.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Record(value) | Self::Json(value) | Self::Custom(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Bytes(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            Self::Records(items) | Self::JsonList(items) => Value::Array(items),
            Self::Headers(map) => Value::Object(map),
            Self::None => Value::Null,
        }
    }

    /// Deserializes into a typed model.
    ///
    /// ```
    /// use emissary::ResponseValue;
    /// use serde::Deserialize;
    /// use serde_json::json;
    ///
    /// #[derive(Deserialize, Debug, PartialEq)]
    /// struct User {
    ///     id: i64,
    ///     name: String,
    /// }
    ///
    /// let value = ResponseValue::Record(json!({"id": 1, "name": "Ann"}));
    /// let user: User = value.into_model().unwrap();
    /// assert_eq!(user, User { id: 1, name: "Ann".into() });
    /// ```
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.into_value()).map_err(|e| EmissaryError::decode(e.to_string()))
    }
}
