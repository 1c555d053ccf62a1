//! Method types and call receivers.

use emissary_core::{EmissaryError, Result};
use serde_json::Value;
use std::fmt;

/// How a route is bound to its owning model, fixed at declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodType {
    /// A free function or static method. Calls take no receiver.
    #[default]
    Static,
    /// A class-level method. Calls take [`Receiver::Class`].
    Class,
    /// An instance method. Calls take [`Receiver::Instance`].
    Instance,
}

impl MethodType {
    /// Returns true for class and instance methods.
    #[must_use]
    pub const fn is_self_method(self) -> bool {
        matches!(self, Self::Class | Self::Instance)
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Static => "static",
            Self::Class => "class",
            Self::Instance => "instance",
        };
        f.write_str(name)
    }
}

/// The receiver of one call, passed explicitly instead of bound on the route.
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// The owning model type itself.
    Class,
    /// One model instance, as its serialized record.
    Instance(Value),
}

impl Receiver {
    /// Builds an instance receiver from any serializable model value.
    pub fn instance<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Instance)
            .map_err(|e| EmissaryError::decode(e.to_string()))
    }

    /// The method type this receiver satisfies.
    #[must_use]
    pub const fn method_type(&self) -> MethodType {
        match self {
            Self::Class => MethodType::Class,
            Self::Instance(_) => MethodType::Instance,
        }
    }

    /// The instance record, if any.
    #[must_use]
    pub const fn as_instance(&self) -> Option<&Value> {
        match self {
            Self::Class => None,
            Self::Instance(value) => Some(value),
        }
    }
}

/// Checks that a call's receiver matches a route's method type.
pub(crate) fn check_receiver(expected: MethodType, receiver: Option<&Receiver>) -> Result<()> {
    let actual = receiver.map_or(MethodType::Static, Receiver::method_type);
    if actual == expected {
        Ok(())
    } else {
        Err(EmissaryError::InvalidReceiver {
            message: format!("{expected} route called with a {actual} receiver"),
        })
    }
}
