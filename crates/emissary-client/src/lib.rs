//! # Emissary Client
//!
//! The transport side of Emissary: what actually talks HTTP.
//!
//! - [`Transport`] / [`AsyncTransport`] - blocking and async transport traits
//! - [`ReqwestTransport`] / [`AsyncReqwestTransport`] - `reqwest` implementations
//! - [`Response`] - a buffered response with `json`, `text`, `content` and
//!   `raise_for_status`
//! - [`RateLimit`] - lazily refilled token bucket
//! - [`TransportManager`] - one transport slot per kind

#![doc(html_root_url = "https://docs.rs/emissary-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod manager;
mod rate_limit;
mod reqwest_transport;
mod response;
mod transport;

pub use manager::TransportManager;
pub use rate_limit::RateLimit;
pub use reqwest_transport::{AsyncReqwestTransport, ReqwestTransport, TransportConfig};
pub use response::Response;
pub use transport::{join_url, normalize_url, AsyncTransport, Transport, TransportKind};
