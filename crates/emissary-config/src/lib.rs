//! Typed configuration for Emissary routers.
//!
//! This crate loads router defaults (host, port, rate limit, case converters,
//! timeout) and logging settings with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use emissary_config::ConfigLoader;
//!
//! # fn main() -> Result<(), emissary_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("emissary.toml")?
//!     .with_env_prefix("EMISSARY")
//!     .load()?;
//!
//! println!("Routing to {}", config.router.host);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [router]
//! host = "https://api.example.com"
//! port = 8443
//! timeout_secs = 30
//!
//! [router.rate_limit]
//! calls = 10
//! period_secs = 1.0
//!
//! [router.cases]
//! default = "snake"
//! query = "camel"
//! response = "snake"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with variables of the form `PREFIX__SECTION__KEY`:
//!
//! - `EMISSARY__ROUTER__HOST=https://staging.example.com`
//! - `EMISSARY__ROUTER__RATE_LIMIT__CALLS=5`
//! - `EMISSARY__ROUTER__CASES__BODY=camel`
//! - `EMISSARY__LOGGING__FORMAT=pretty`

#![doc(html_root_url = "https://docs.rs/emissary-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{EmissaryConfig, EmissaryConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CaseSettings, LogFormat, LoggingSettings, RateLimitSettings, RouterSettings};
