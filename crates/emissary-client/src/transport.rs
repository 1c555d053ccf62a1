//! Transport traits.
//!
//! A transport performs one HTTP exchange for a [`TransportRequest`]. Routes
//! pick the synchronous or asynchronous pipeline by which trait the transport
//! implements.

use crate::Response;
use async_trait::async_trait;
use emissary_core::{Result, TransportRequest};
use std::fmt;

/// A blocking transport.
pub trait Transport: Send + Sync {
    /// Base URL requests are resolved against.
    fn base_url(&self) -> &str;

    /// Performs one request.
    fn request(&self, request: &TransportRequest) -> Result<Response>;
}

/// An asynchronous transport.
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    /// Base URL requests are resolved against.
    fn base_url(&self) -> &str;

    /// Performs one request.
    async fn request(&self, request: &TransportRequest) -> Result<Response>;
}

/// Which pipeline a transport serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Blocking calls.
    Sync,
    /// Asynchronous calls.
    Async,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("Client"),
            Self::Async => f.write_str("AsyncClient"),
        }
    }
}

/// Normalises a URL for comparison: lowercase scheme and host, no trailing slash.
///
/// ```
/// use emissary_client::normalize_url;
///
/// assert_eq!(normalize_url("HTTPS://API.Example.com/"), "https://api.example.com");
/// assert_eq!(normalize_url("https://api.example.com/V1/"), "https://api.example.com/V1");
/// ```
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let (authority, path) = match rest.find('/') {
                Some(idx) => rest.split_at(idx),
                None => (rest, ""),
            };
            format!(
                "{}://{}{}",
                scheme.to_ascii_lowercase(),
                authority.to_ascii_lowercase(),
                path
            )
        }
        None => trimmed.to_string(),
    }
}

/// Resolves a request URL against a base URL.
///
/// Absolute URLs are returned unchanged.
///
/// ```
/// use emissary_client::join_url;
///
/// assert_eq!(join_url("https://api.test/v1/", "/users"), "https://api.test/v1/users");
/// assert_eq!(join_url("https://api.test", "users"), "https://api.test/users");
/// assert_eq!(join_url("https://api.test", "http://other/x"), "http://other/x");
/// ```
pub fn join_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = url.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if base.is_empty() {
        format!("/{path}")
    } else {
        format!("{base}/{path}")
    }
}
