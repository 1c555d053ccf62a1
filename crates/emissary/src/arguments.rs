//! Call arguments.

use emissary_core::{EmissaryError, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Named arguments of one route call, in the order given.
///
/// # Example
///
/// ```
/// use emissary::{kwargs, Kwargs};
///
/// let args = Kwargs::new().arg("id", 1).arg("name", "Ann");
/// assert_eq!(args.len(), 2);
///
/// let same = kwargs! { "id" => 1, "name" => "Ann" };
/// assert_eq!(args, same);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(IndexMap<String, Value>);

impl Kwargs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builds arguments from the fields of a serializable struct.
    ///
    /// # Errors
    ///
    /// `Validation` if the value does not serialize to an object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(map.into()),
            Ok(other) => Err(EmissaryError::validation(
                "kwargs",
                format!("expected object, got {}", emissary_core::value_type_name(&other)),
            )),
            Err(e) => Err(EmissaryError::validation("kwargs", e.to_string())),
        }
    }

    /// Looks up an argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Argument names.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Kwargs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builds [`Kwargs`] from `name => value` pairs.
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::Kwargs::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::Kwargs::new()$(.arg($name, $value))+
    };
}
