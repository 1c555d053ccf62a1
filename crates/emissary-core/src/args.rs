//! The per-call request envelope.
//!
//! [`Args`] is built by the endpoint from call-time arguments, handed to the
//! preparer hooks (which may rewrite any part of it) and finally flattened into
//! a [`TransportRequest`].

use crate::path::{placeholders, value_to_string};
use crate::{EmissaryError, HttpMethod, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request arguments threaded through the preparer hooks.
///
/// # Example
///
/// ```
/// use emissary_core::{Args, HttpMethod};
/// use serde_json::json;
///
/// let mut args = Args::new("/users/1");
/// args.params.insert("verbose".into(), json!(true));
/// args.headers.insert("X-Trace".into(), json!(null));
///
/// let request = args.into_request(HttpMethod::Get).unwrap();
/// assert_eq!(request.query_pairs(), vec![("verbose".to_string(), "true".to_string())]);
/// assert!(request.headers.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Args {
    /// Path relative to the router base URL, or an absolute URL.
    pub url: String,
    /// Query parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// JSON body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    /// Form fields, or a raw body for custom media types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Multipart file fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Value>,
    /// Request headers.
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Request cookies.
    #[serde(default)]
    pub cookies: Map<String, Value>,
}

impl Args {
    /// Creates empty arguments for a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Placeholders still present in the URL.
    pub fn placeholders(&self) -> Vec<String> {
        placeholders(&self.url)
    }

    /// Removes null values everywhere, and bodies left empty by doing so.
    pub fn drop_nulls(&mut self) {
        drop_null_entries(&mut self.params);
        drop_null_entries(&mut self.headers);
        drop_null_entries(&mut self.cookies);
        for body in [&mut self.json, &mut self.data, &mut self.files] {
            if let Some(value) = body.as_mut() {
                drop_nulls(value);
            }
            if body.as_ref().is_some_and(is_empty_body) {
                *body = None;
            }
        }
    }

    /// Flattens into transport arguments.
    ///
    /// Fails with `UnresolvedPlaceholder` if the URL still has a `{name}`
    /// placeholder, which can happen when a preparer rewrites the URL.
    pub fn into_request(mut self, method: HttpMethod) -> Result<TransportRequest> {
        self.drop_nulls();
        if !self.placeholders().is_empty() {
            return Err(EmissaryError::unresolved_placeholder(self.url));
        }
        Ok(TransportRequest {
            method,
            url: self.url,
            params: self.params,
            json: self.json,
            data: self.data,
            files: self.files,
            headers: self.headers,
            cookies: self.cookies,
        })
    }
}

fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn drop_null_entries(map: &mut Map<String, Value>) {
    map.retain(|_, v| !v.is_null());
    for value in map.values_mut() {
        drop_nulls(value);
    }
}

/// Recursively removes null object entries.
pub fn drop_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => drop_null_entries(map),
        Value::Array(items) => items.iter_mut().for_each(drop_nulls),
        _ => {}
    }
}

/// Flattened arguments of one transport call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the transport base URL, or an absolute URL.
    pub url: String,
    /// Query parameters.
    pub params: Map<String, Value>,
    /// JSON body.
    pub json: Option<Value>,
    /// Form fields or raw body.
    pub data: Option<Value>,
    /// Multipart file fields.
    pub files: Option<Value>,
    /// Headers.
    pub headers: Map<String, Value>,
    /// Cookies.
    pub cookies: Map<String, Value>,
}

impl TransportRequest {
    /// Query pairs; arrays repeat their key once per item.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            match value {
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|v| (key.clone(), value_to_string(v))));
                }
                other => pairs.push((key.clone(), value_to_string(other))),
            }
        }
        pairs
    }

    /// Header pairs with values rendered as text.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect()
    }

    /// A `Cookie` header value, if any cookie is set.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={}", value_to_string(v)))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| value_to_string(v))
    }

    /// Form pairs of the `data` bucket, if it is a mapping.
    pub fn form_pairs(&self) -> Option<Vec<(String, String)>> {
        let Some(Value::Object(map)) = &self.data else {
            return None;
        };
        let mut pairs = Vec::with_capacity(map.len());
        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|v| (key.clone(), value_to_string(v))));
                }
                other => pairs.push((key.clone(), value_to_string(other))),
            }
        }
        Some(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drop_nulls_recursive() {
        let mut value = json!({"a": null, "b": {"c": null, "d": 1}, "e": [{"f": null}]});
        drop_nulls(&mut value);
        assert_eq!(value, json!({"b": {"d": 1}, "e": [{}]}));
    }

    #[test]
    fn test_empty_bodies_are_dropped() {
        let mut args = Args::new("/x");
        args.json = Some(json!({"only": null}));
        args.data = Some(json!("raw"));
        args.drop_nulls();
        assert_eq!(args.json, None);
        assert_eq!(args.data, Some(json!("raw")));
    }

    #[test]
    fn test_unresolved_placeholder() {
        let args = Args::new("/users/{id}");
        let err = args.into_request(HttpMethod::Get).unwrap_err();
        assert!(matches!(err, EmissaryError::UnresolvedPlaceholder { ref url } if url == "/users/{id}"));
    }

    #[test]
    fn test_query_pairs_repeat_arrays() {
        let mut args = Args::new("/search");
        args.params.insert("tag".into(), json!(["a", "b"]));
        args.params.insert("page".into(), json!(2));
        let request = args.into_request(HttpMethod::Get).unwrap();
        assert_eq!(
            request.query_pairs(),
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_cookie_header() {
        let mut args = Args::new("/");
        args.cookies.insert("session".into(), json!("abc"));
        args.cookies.insert("theme".into(), json!("dark"));
        let request = args.into_request(HttpMethod::Get).unwrap();
        assert_eq!(
            request.cookie_header().as_deref(),
            Some("session=abc; theme=dark")
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut args = Args::new("/");
        args.headers.insert("Content-Type".into(), json!("text/csv"));
        let request = args.into_request(HttpMethod::Post).unwrap();
        assert_eq!(request.header("content-type").as_deref(), Some("text/csv"));
    }

    #[test]
    fn test_serde_shape() {
        let mut args = Args::new("/u");
        args.json = Some(json!({"a": 1}));
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(value["json"], json!({"a": 1}));
        assert!(value.get("files").is_none());
    }
}
