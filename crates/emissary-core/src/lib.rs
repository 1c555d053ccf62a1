//! # Emissary Core
//!
//! Core types for the Emissary declarative HTTP client.
//!
//! This crate holds the pieces every other Emissary crate builds on:
//!
//! - [`EmissaryError`] - the error taxonomy of routed calls
//! - [`cases`] - case converters and [`CaseConverter`]
//! - [`Schema`] - value schemas used to validate arguments and responses
//! - [`Param`] - parameter markers (path, query, header, cookie, body, form, file)
//! - [`HttpMethod`] - the nine standard verbs
//! - [`Args`] / [`TransportRequest`] - the per-call request envelope
//! - [`PathTemplate`] - `{name}` URL templates

#![doc(html_root_url = "https://docs.rs/emissary-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod args;
pub mod cases;
mod error;
mod method;
mod param;
pub mod path;
mod schema;

pub use args::{drop_nulls, Args, TransportRequest};
pub use cases::{CaseConverter, CaseName};
pub use error::{EmissaryError, FieldError, FieldErrors, Result};
pub use method::HttpMethod;
pub use param::{Param, ParamKind, FORM_URLENCODED, JSON, MULTIPART};
pub use path::{PathSegment, PathTemplate};
pub use schema::{value_type_name, Pattern, Schema};
