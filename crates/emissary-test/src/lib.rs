//! # Emissary Test
//!
//! Test utilities for Emissary: in-memory transports that record every
//! outgoing request and answer with canned responses, so routed calls can be
//! exercised without a network.
//!
//! ## Example
//!
//! ```
//! use emissary_client::Transport;
//! use emissary_core::{Args, HttpMethod};
//! use emissary_test::{MockResponse, MockTransport};
//! use serde_json::json;
//!
//! let mock = MockTransport::queue(
//!     "https://api.test",
//!     [MockResponse::json(&json!({"id": 1})), MockResponse::with_status(404)],
//! );
//!
//! let request = Args::new("/users/1").into_request(HttpMethod::Get).unwrap();
//! assert!(mock.request(&request).unwrap().is_success());
//! assert!(!mock.request(&request).unwrap().is_success());
//! assert_eq!(mock.request_count(), 2);
//! ```

#![doc(html_root_url = "https://docs.rs/emissary-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod response;
mod transport;

pub use response::MockResponse;
pub use transport::{MockAsyncTransport, MockHandler, MockTransport};
