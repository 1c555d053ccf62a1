//! # Emissary
//!
//! **Declarative HTTP API clients.**
//!
//! Describe each API operation once, as a route with typed parameters and a
//! declared response shape, and call it like a function:
//!
//! - 🧭 **Routes** – path templates, parameter markers for path, query,
//!   header, cookie and body, validated at declaration time
//! - 🔤 **Case conversion** – per-channel key converters resolved from the
//!   route, then the router
//! - 🪝 **Hooks** – argument preparers, JSON finalizers and response
//!   finalizers, blocking or async
//! - 📦 **Models** – group routes under one resource type and install
//!   router-wide hooks in one binding pass
//! - ⏱️ **Rate limiting** – a token bucket shared by every route of a router
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emissary::prelude::*;
//!
//! fn main() -> emissary::Result<()> {
//!     let router = Router::new("https://api.example.com");
//!     router.set_case(Channel::Query, Some(CaseConverter::camel()));
//!
//!     let get_user = router
//!         .get("/users/{id}")
//!         .param("id", Param::path(Schema::integer()))
//!         .param("include_posts", FieldDecl::plain_with_default(Schema::boolean(), false))
//!         .returns(ResponseType::Json)
//!         .build()?;
//!
//!     let user = get_user.call(&kwargs! { "id" => 1 })?;
//!     println!("{:?}", user.into_value());
//!     Ok(())
//! }
//! ```
//!
//! ## Call pipeline
//!
//! ```text
//! kwargs → BUILDING → PREPARING → DISPATCHING → FINALIZING → value
//!          validate    preparers   rate limit    response case
//!          + parse                 + transport   + finalizers
//! ```

#![doc(html_root_url = "https://docs.rs/emissary/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod arguments;
mod channels;
mod endpoint;
mod hooks;
mod model;
mod parser;
mod receiver;
mod requester;
mod response;
mod route;
mod router;

pub use arguments::Kwargs;
pub use channels::{CaseConverters, CaseOverrides, Channel};
pub use endpoint::{Endpoint, EndpointContext, FieldDecl, ResponseType};
pub use hooks::{JsonFinalizer, Preparer, ResponseFinalizer};
pub use model::{Model, ModelBuilder, ModelHook, ModelType};
pub use parser::{is_json_media_type, FieldRef, ParamsParser, Payload, JSON_MEDIA_TYPES};
pub use receiver::{MethodType, Receiver};
pub use response::{DecoratedResponse, ResponseValue};
pub use route::{Route, RouteBuilder};
pub use router::{Router, RouterBuilder};

pub use emissary_core::{EmissaryError, Result};

// Re-export member crates
pub use emissary_client as client;
pub use emissary_config as config;
pub use emissary_core as core;
pub use emissary_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use emissary::prelude::*;
///
/// let router = Router::new("https://api.example.com");
/// let route = router.get("/health").returns(ResponseType::Text).build().unwrap();
/// assert_eq!(route.method(), HttpMethod::Get);
/// ```
pub mod prelude {
    pub use crate::{
        kwargs, CaseOverrides, Channel, DecoratedResponse, FieldDecl, JsonFinalizer, Kwargs,
        MethodType, Model, ModelHook, ModelType, Preparer, Receiver, ResponseFinalizer,
        ResponseType, ResponseValue, Route, Router,
    };

    // Re-export core types
    pub use emissary_core::{
        Args, CaseConverter, CaseName, EmissaryError, HttpMethod, Param, Result, Schema,
    };

    // Re-export transport types
    pub use emissary_client::{RateLimit, TransportConfig, TransportManager};

    // Re-export configuration and logging
    pub use emissary_config::{ConfigLoader, EmissaryConfig};
    pub use emissary_telemetry::{init_logging, LogConfig};
}
