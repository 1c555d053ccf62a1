//! Transports backed by `reqwest`.

use crate::transport::{join_url, AsyncTransport, Transport};
use crate::Response;
use async_trait::async_trait;
use emissary_core::path::value_to_string;
use emissary_core::{EmissaryError, Result, TransportRequest};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Settings shared by both reqwest transports.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("emissary/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    /// Sets the whole-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// One multipart file part.
#[derive(Debug, Clone, PartialEq)]
struct FilePart {
    field: String,
    file_name: String,
    content: Vec<u8>,
    content_type: Option<String>,
}

impl FilePart {
    /// Reads a part from either raw text or `{filename, content, content_type}`.
    fn from_value(field: &str, value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                field: field.to_string(),
                file_name: map
                    .get("filename")
                    .and_then(Value::as_str)
                    .unwrap_or(field)
                    .to_string(),
                content: map
                    .get("content")
                    .map(value_to_string)
                    .unwrap_or_default()
                    .into_bytes(),
                content_type: map
                    .get("content_type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            other => Self {
                field: field.to_string(),
                file_name: field.to_string(),
                content: value_to_string(other).into_bytes(),
                content_type: None,
            },
        }
    }
}

/// Request body after encoding.
#[derive(Debug, Clone, PartialEq)]
enum EncodedBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Raw(Vec<u8>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

fn encode_body(request: &TransportRequest) -> EncodedBody {
    if let Some(files) = &request.files {
        let mut parts = Vec::new();
        match files {
            Value::Object(map) => {
                for (field, value) in map {
                    match value {
                        Value::Array(items) => {
                            parts.extend(items.iter().map(|v| FilePart::from_value(field, v)));
                        }
                        other => parts.push(FilePart::from_value(field, other)),
                    }
                }
            }
            other => parts.push(FilePart::from_value("file", other)),
        }
        return EncodedBody::Multipart {
            fields: request.form_pairs().unwrap_or_default(),
            files: parts,
        };
    }

    if let Some(json) = &request.json {
        return EncodedBody::Json(json.clone());
    }

    match &request.data {
        None => EncodedBody::Empty,
        Some(Value::Object(_)) => EncodedBody::Form(request.form_pairs().unwrap_or_default()),
        Some(Value::String(raw)) => EncodedBody::Raw(raw.clone().into_bytes()),
        Some(other) => EncodedBody::Raw(other.to_string().into_bytes()),
    }
}

fn transport_error(context: &str, error: reqwest::Error) -> EmissaryError {
    let message = if error.is_timeout() {
        format!("{context}: request timed out")
    } else {
        format!("{context}: {error}")
    };
    EmissaryError::transport_with_source(message, error)
}

/// Blocking transport over `reqwest::blocking::Client`.
///
/// Must not be created or dropped inside an async runtime; use
/// [`AsyncReqwestTransport`] there.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, &TransportConfig::default())
    }

    /// Creates a transport with custom settings.
    pub fn with_config(base_url: impl Into<String>, config: &TransportConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| transport_error("failed to build HTTP client", e))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn multipart(
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    ) -> Result<reqwest::blocking::multipart::Form> {
        let mut form = reqwest::blocking::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        for file in files {
            let mut part =
                reqwest::blocking::multipart::Part::bytes(file.content).file_name(file.file_name);
            if let Some(content_type) = &file.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| transport_error("invalid file content type", e))?;
            }
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

impl Transport for ReqwestTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, request: &TransportRequest) -> Result<Response> {
        let url = join_url(&self.base_url, &request.url);
        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.to_http(), &url)
            .query(&request.query_pairs());
        for (name, value) in request.header_pairs() {
            builder = builder.header(name, value);
        }
        if let Some(cookie) = request.cookie_header() {
            builder = builder.header(http::header::COOKIE, cookie);
        }
        builder = match encode_body(request) {
            EncodedBody::Empty => builder,
            EncodedBody::Json(value) => builder.json(&value),
            EncodedBody::Form(pairs) => builder.form(&pairs),
            EncodedBody::Raw(bytes) => builder.body(bytes),
            EncodedBody::Multipart { fields, files } => {
                builder.multipart(Self::multipart(fields, files)?)
            }
        };

        let response = builder
            .send()
            .map_err(|e| transport_error("request failed", e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .map_err(|e| transport_error("failed to read response body", e))?;
        debug!(status = status.as_u16(), url = %final_url, "received response");

        Ok(Response::new(status, headers, body, final_url))
    }
}

/// Asynchronous transport over `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct AsyncReqwestTransport {
    base_url: String,
    client: reqwest::Client,
}

impl AsyncReqwestTransport {
    /// Creates a transport with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, &TransportConfig::default())
    }

    /// Creates a transport with custom settings.
    pub fn with_config(base_url: impl Into<String>, config: &TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| transport_error("failed to build HTTP client", e))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Wraps an existing client.
    pub fn from_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn multipart(
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    ) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        for file in files {
            let mut part = reqwest::multipart::Part::bytes(file.content).file_name(file.file_name);
            if let Some(content_type) = &file.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| transport_error("invalid file content type", e))?;
            }
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

#[async_trait]
impl AsyncTransport for AsyncReqwestTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, request: &TransportRequest) -> Result<Response> {
        let url = join_url(&self.base_url, &request.url);
        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.to_http(), &url)
            .query(&request.query_pairs());
        for (name, value) in request.header_pairs() {
            builder = builder.header(name, value);
        }
        if let Some(cookie) = request.cookie_header() {
            builder = builder.header(http::header::COOKIE, cookie);
        }
        builder = match encode_body(request) {
            EncodedBody::Empty => builder,
            EncodedBody::Json(value) => builder.json(&value),
            EncodedBody::Form(pairs) => builder.form(&pairs),
            EncodedBody::Raw(bytes) => builder.body(bytes),
            EncodedBody::Multipart { fields, files } => {
                builder.multipart(Self::multipart(fields, files)?)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error("request failed", e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error("failed to read response body", e))?;
        debug!(status = status.as_u16(), url = %final_url, "received response");

        Ok(Response::new(status, headers, body, final_url))
    }
}
