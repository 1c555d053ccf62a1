//! Raw HTTP responses.

use bytes::Bytes;
use emissary_core::{EmissaryError, Result};
use http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

/// A fully buffered HTTP response, as returned by every transport.
///
/// # Example
///
/// ```
/// use emissary_client::Response;
/// use http::{HeaderMap, StatusCode};
///
/// let response = Response::new(StatusCode::OK, HeaderMap::new(), r#"{"id":1}"#, "/users/1");
/// assert_eq!(response.json().unwrap()["id"], 1);
/// assert!(response.raise_for_status().is_ok());
///
/// let missing = Response::new(StatusCode::NOT_FOUND, HeaderMap::new(), "", "/users/2");
/// assert_eq!(missing.raise_for_status().unwrap_err().status(), Some(404));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    url: String,
}

impl Response {
    /// Creates a response.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            url: url.into(),
        }
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status code as a number.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Headers as a JSON mapping; repeated headers are joined with `", "`.
    pub fn headers_map(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = Map::new();
        for (name, value) in &self.headers {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            match map.get_mut(name.as_str()) {
                Some(Value::String(existing)) => {
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                _ => {
                    map.insert(name.as_str().to_string(), Value::String(value));
                }
            }
        }
        map
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).map_err(|e| {
            EmissaryError::decode(format!(
                "failed to parse JSON (status {}): {e}",
                self.status.as_u16()
            ))
        })
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Raw body.
    pub fn content(&self) -> &Bytes {
        &self.body
    }

    /// Final request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Fails with `Status` unless the status is 2xx.
    pub fn raise_for_status(&self) -> Result<&Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(EmissaryError::Status {
            status: self.status.as_u16(),
            reason: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            url: self.url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_text_and_content() {
        let response = Response::new(StatusCode::OK, HeaderMap::new(), "hello", "/");
        assert_eq!(response.text(), "hello");
        assert_eq!(response.content().as_ref(), b"hello");
        assert_eq!(response.status_code(), 200);
    }

    #[test]
    fn test_json_decode_error() {
        let response = Response::new(StatusCode::OK, HeaderMap::new(), "not json", "/");
        let err = response.json().unwrap_err();
        assert!(matches!(err, EmissaryError::Decode { .. }));
    }

    #[test]
    fn test_headers_map_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("allow", HeaderValue::from_static("GET"));
        headers.append("allow", HeaderValue::from_static("POST"));
        headers.insert("x-total", HeaderValue::from_static("3"));
        let response = Response::new(StatusCode::OK, headers, "", "/");

        let map = response.headers_map();
        assert_eq!(map["allow"], "GET, POST");
        assert_eq!(map["x-total"], "3");
    }

    #[test]
    fn test_raise_for_status() {
        let response = Response::new(StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), "", "/x");
        let err = response.raise_for_status().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Server error '500 Internal Server Error' for url '/x'"
        );
    }
}
