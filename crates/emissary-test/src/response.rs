//! Canned responses for mock transports.

use bytes::Bytes;
use emissary_client::Response;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

/// A response template that mock transports turn into a [`Response`].
///
/// # Example
///
/// ```
/// use emissary_test::MockResponse;
/// use serde_json::json;
///
/// let response = MockResponse::json(&json!({"id": 1}))
///     .status(201)
///     .header("x-request-id", "abc")
///     .into_response("https://api.test/users");
///
/// assert_eq!(response.status_code(), 201);
/// assert_eq!(response.json().unwrap()["id"], 1);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl MockResponse {
    /// An empty `200 OK`.
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A `200 OK` with a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::ok()
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(body)
    }

    /// A `200 OK` with a plain text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::ok()
            .header(CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")
            .body(text.into())
    }

    /// A `200 OK` with a raw body.
    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self::ok()
            .header(CONTENT_TYPE.as_str(), "application/octet-stream")
            .body(body)
    }

    /// An empty response with the given status.
    pub fn with_status(status: u16) -> Self {
        Self::ok().status(status)
    }

    /// Sets the status code. Invalid codes fall back to 500.
    pub fn status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self
    }

    /// Appends a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Replaces the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Status code of the template.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Builds the response as if it answered `url`.
    #[must_use]
    pub fn into_response(self, url: impl Into<String>) -> Response {
        Response::new(self.status, self.headers, self.body, url)
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::ok()
    }
}
