//! Error types for Emissary.
//!
//! This module provides [`EmissaryError`], the single error type surfaced by
//! every stage of a routed call. Errors fall into three groups:
//!
//! | Group | Raised | Variants |
//! |---|---|---|
//! | Definition | when a route or model is built | `InvalidMethod`, `InvalidParameter`, `InvalidReturnAnnotation`, `MissingFinalizer`, `InvalidPort`, `ModelAlreadyBound`, `InvalidHookOwner` |
//! | Call | while assembling or resolving a call | `Validation`, `ResponseValidation`, `IncompatibleMediaTypes`, `EmbedConflict`, `UnresolvedPlaceholder`, `AsyncHookMisuse`, `InvalidReceiver`, `Hook` |
//! | Transport | while talking to the HTTP engine | `Status`, `Transport`, `Decode`, `BaseUrlMismatch`, `CollectionLimit`, `ClientNotSet` |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`EmissaryError`].
pub type Result<T, E = EmissaryError> = std::result::Result<T, E>;

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Location of the offending value, e.g. `id` or `profile.tags[2]`.
    pub loc: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(loc: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.message)
    }
}

/// Every field error collected by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for a location.
    pub fn push(&mut self, loc: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(loc, message));
    }

    /// Moves every error of `other` into this collection.
    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    /// Returns true if no error was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the recorded errors.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Returns true if any error is located at `loc`.
    #[must_use]
    pub fn contains(&self, loc: &str) -> bool {
        self.0.iter().any(|e| e.loc == loc)
    }

    /// Turns the collection into `Ok(())` when empty, or into the error built by `f`.
    pub fn into_result<F>(self, f: F) -> Result<()>
    where
        F: FnOnce(FieldErrors) -> EmissaryError,
    {
        if self.is_empty() {
            Ok(())
        } else {
            Err(f(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.len();
        write!(
            f,
            "{count} validation error{}",
            if count == 1 { "" } else { "s" }
        )?;
        for error in &self.0 {
            write!(f, "; {error}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Standard error type for Emissary.
///
/// # Example
///
/// ```
/// use emissary_core::EmissaryError;
///
/// let err = EmissaryError::invalid_method("FETCH");
/// assert_eq!(err.to_string(), "Invalid HTTP method: FETCH");
/// assert!(err.is_definition_error());
/// ```
#[derive(Error, Debug)]
pub enum EmissaryError {
    /// The HTTP verb is not one of the nine standard methods.
    #[error("Invalid HTTP method: {method}")]
    InvalidMethod {
        /// The rejected verb.
        method: String,
    },

    /// A parameter declaration cannot be honoured.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// Call-time arguments failed coercion or constraint checks.
    #[error("Validation error: {errors}")]
    Validation {
        /// Every failed field.
        errors: FieldErrors,
    },

    /// The resolved response does not conform to the declared return type.
    #[error("Response validation error: {errors}")]
    ResponseValidation {
        /// Every failed location.
        errors: FieldErrors,
    },

    /// A self-referential return type used outside its legal binding.
    #[error("Invalid return annotation: {message}")]
    InvalidReturnAnnotation {
        /// Why the annotation is rejected.
        message: String,
    },

    /// The declared response type needs a response finalizer and none is set.
    #[error("Response finalizer must be set if response is {response}")]
    MissingFinalizer {
        /// Description of the declared response type.
        response: String,
    },

    /// Two body parameters declare incompatible media types.
    #[error(
        "Body parameters cannot have different media types. You try to use {second} and {first}"
    )]
    IncompatibleMediaTypes {
        /// Media type already in effect.
        first: String,
        /// Conflicting media type.
        second: String,
    },

    /// Embed and non-embed body parameters are mixed, or duplicated.
    #[error("Embed conflict: {message}")]
    EmbedConflict {
        /// Which rule was broken.
        message: String,
    },

    /// A `{placeholder}` remained in the URL.
    #[error("Path params of {url} must be passed")]
    UnresolvedPlaceholder {
        /// The URL still containing placeholders.
        url: String,
    },

    /// An asynchronous hook was reached on the synchronous call path.
    #[error("If {hook} is async, the route must be called asynchronously")]
    AsyncHookMisuse {
        /// Hook name.
        hook: String,
    },

    /// A second transport was set on an occupied manager slot.
    #[error("Manager size limit exceeded. It can contain only 1 Client, 1 AsyncClient.")]
    CollectionLimit,

    /// A manager slot was read while empty.
    #[error("{kind} is not set")]
    ClientNotSet {
        /// `Client` or `AsyncClient`.
        kind: String,
    },

    /// A second model was bound to the same router.
    #[error("Only one model can be associated with a router")]
    ModelAlreadyBound,

    /// A model hook was declared on an instance.
    #[error("Class hook {hook} cannot be instance method")]
    InvalidHookOwner {
        /// Hook name.
        hook: String,
    },

    /// The port is outside 1..=65535.
    #[error("Port must be between 1 and 65535, got {port}")]
    InvalidPort {
        /// The rejected port.
        port: u32,
    },

    /// The call's receiver does not match the route's method type.
    #[error("Invalid receiver: {message}")]
    InvalidReceiver {
        /// What was expected.
        message: String,
    },

    /// A managed transport points at another base URL.
    #[error("Client base url must be equal to Router base url ({client} != {router})")]
    BaseUrlMismatch {
        /// Transport base URL.
        client: String,
        /// Router base URL.
        router: String,
    },

    /// Non-2xx status raised by `raise_for_status`.
    #[error("{} error '{status} {reason}' for url '{url}'", status_class(.status))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
        /// Request URL.
        url: String,
    },

    /// The HTTP engine failed before a response was produced.
    #[error("Transport error: {message}")]
    Transport {
        /// Engine message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A response body could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },

    /// A user hook failed.
    #[error("Hook error: {0}")]
    Hook(#[source] anyhow::Error),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn status_class(status: &u16) -> &'static str {
    match *status {
        100..=199 => "Informational response",
        300..=399 => "Redirect response",
        400..=499 => "Client",
        500..=599 => "Server",
        _ => "Invalid status code",
    }
}

impl EmissaryError {
    /// Creates an invalid method error.
    #[must_use]
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod {
            method: method.into(),
        }
    }

    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error from a single message.
    #[must_use]
    pub fn validation(loc: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(loc, message);
        Self::Validation { errors }
    }

    /// Creates a response validation error from a single message.
    #[must_use]
    pub fn response_validation(loc: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(loc, message);
        Self::ResponseValidation { errors }
    }

    /// Creates an invalid return annotation error.
    #[must_use]
    pub fn invalid_return(message: impl Into<String>) -> Self {
        Self::InvalidReturnAnnotation {
            message: message.into(),
        }
    }

    /// Creates an incompatible media types error.
    #[must_use]
    pub fn incompatible_media_types(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::IncompatibleMediaTypes {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Creates an embed conflict error.
    #[must_use]
    pub fn embed_conflict(message: impl Into<String>) -> Self {
        Self::EmbedConflict {
            message: message.into(),
        }
    }

    /// Creates an unresolved placeholder error.
    #[must_use]
    pub fn unresolved_placeholder(url: impl Into<String>) -> Self {
        Self::UnresolvedPlaceholder { url: url.into() }
    }

    /// Creates an async hook misuse error.
    #[must_use]
    pub fn async_hook(hook: impl Into<String>) -> Self {
        Self::AsyncHookMisuse { hook: hook.into() }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error with a source error.
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Wraps a user hook failure.
    pub fn hook(source: impl Into<anyhow::Error>) -> Self {
        Self::Hook(source.into())
    }

    /// Returns true for errors raised while a route or model is being defined.
    #[must_use]
    pub const fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMethod { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidReturnAnnotation { .. }
                | Self::MissingFinalizer { .. }
                | Self::InvalidPort { .. }
                | Self::ModelAlreadyBound
                | Self::InvalidHookOwner { .. }
        )
    }

    /// Returns true when the caller's input is at fault: bad arguments,
    /// conflicting body declarations, unresolved paths or a 4xx answer.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::Validation { .. }
            | Self::IncompatibleMediaTypes { .. }
            | Self::EmbedConflict { .. }
            | Self::UnresolvedPlaceholder { .. }
            | Self::InvalidReceiver { .. } => true,
            Self::Status { status, .. } => *status >= 400 && *status < 500,
            _ => false,
        }
    }

    /// Returns the HTTP status for `Status` errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the collected field errors of validation failures.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { errors } | Self::ResponseValidation { errors } => Some(errors),
            _ => None,
        }
    }
}
