//! Logging setup for Emissary.
//!
//! Emissary crates emit `tracing` events at each stage of a routed call
//! (`debug!` per pipeline state, `info!` when a model binds to a router,
//! `warn!` on status errors, `trace!` for rate-limit waits). This crate installs
//! a subscriber that renders them as JSON or pretty text.
//!
//! # Example
//!
//! ```rust,ignore
//! use emissary_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production().with_service_name("billing-client"))?;
//! ```

#![doc(html_root_url = "https://docs.rs/emissary-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
