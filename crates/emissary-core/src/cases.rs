//! Case converters.
//!
//! A case converter is a pure `&str -> String` function applied to parameter
//! names of one request channel, or to the keys of a JSON response.
//!
//! | Converter | `first_name` | `HTTPServer` |
//! |---|---|---|
//! | [`snake_case`] | `first_name` | `http_server` |
//! | [`camel_case`] | `firstName` | `httpServer` |
//! | [`pascal_case`] | `FirstName` | `HttpServer` |
//! | [`constant_case`] | `FIRST_NAME` | `HTTP_SERVER` |
//! | [`kebab_case`] | `first-name` | `http-server` |
//! | [`header_case`] | `First-Name` | `Http-Server` |
//!
//! All converters share one word splitter: any non-alphanumeric character
//! separates words, a lowercase letter or digit followed by an uppercase letter
//! starts a new word, and an uppercase run followed by a lowercase letter ends
//! before its last capital (`HTTPServer` → `HTTP`, `Server`).

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Splits a string into words.
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let starts_word = prev.is_lowercase()
                || prev.is_numeric()
                || (prev.is_uppercase() && next_is_lower);
            if starts_word {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Uppercases the first character and lowercases the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Converts to `snake_case`.
///
/// ```
/// use emissary_core::cases::snake_case;
///
/// assert_eq!(snake_case("myParam"), "my_param");
/// ```
pub fn snake_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Converts to `camelCase`.
///
/// ```
/// use emissary_core::cases::camel_case;
///
/// assert_eq!(camel_case("my_param"), "myParam");
/// ```
pub fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, word) in words(s).iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// Converts to `PascalCase`.
pub fn pascal_case(s: &str) -> String {
    words(s).iter().map(|w| capitalize(w)).collect()
}

/// Converts to `CONSTANT_CASE`.
pub fn constant_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Converts to `kebab-case`.
pub fn kebab_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Converts to `Header-Case`.
///
/// ```
/// use emissary_core::cases::header_case;
///
/// assert_eq!(header_case("x_request_id"), "X-Request-Id");
/// ```
pub fn header_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join("-")
}

/// A named, cloneable case conversion function.
///
/// # Example
///
/// ```
/// use emissary_core::CaseConverter;
///
/// let camel = CaseConverter::camel();
/// assert_eq!(camel.convert("first_name"), "firstName");
///
/// let shout = CaseConverter::new("shout", |s| s.to_uppercase());
/// assert_eq!(shout.convert("id"), "ID");
/// ```
#[derive(Clone)]
pub struct CaseConverter {
    name: Cow<'static, str>,
    func: Option<Arc<dyn Fn(&str) -> String + Send + Sync>>,
}

impl CaseConverter {
    /// Wraps a custom conversion function.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Some(Arc::new(func)),
        }
    }

    /// The converter that returns its input unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            name: Cow::Borrowed("identity"),
            func: None,
        }
    }

    /// See [`snake_case`].
    #[must_use]
    pub fn snake() -> Self {
        Self::new("snake_case", snake_case)
    }

    /// See [`camel_case`].
    #[must_use]
    pub fn camel() -> Self {
        Self::new("camel_case", camel_case)
    }

    /// See [`pascal_case`].
    #[must_use]
    pub fn pascal() -> Self {
        Self::new("pascal_case", pascal_case)
    }

    /// See [`constant_case`].
    #[must_use]
    pub fn constant() -> Self {
        Self::new("constant_case", constant_case)
    }

    /// See [`kebab_case`].
    #[must_use]
    pub fn kebab() -> Self {
        Self::new("kebab_case", kebab_case)
    }

    /// See [`header_case`].
    #[must_use]
    pub fn header() -> Self {
        Self::new("header_case", header_case)
    }

    /// Applies the conversion.
    pub fn convert(&self, s: &str) -> String {
        match &self.func {
            Some(func) => func(s),
            None => s.to_string(),
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true for [`CaseConverter::identity`].
    pub fn is_identity(&self) -> bool {
        self.func.is_none()
    }
}

impl Default for CaseConverter {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for CaseConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CaseConverter").field(&self.name).finish()
    }
}

/// Built-in converters addressable by name, e.g. from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseName {
    /// No conversion.
    Identity,
    /// `snake_case`
    Snake,
    /// `camelCase`
    Camel,
    /// `PascalCase`
    Pascal,
    /// `CONSTANT_CASE`
    Constant,
    /// `kebab-case`
    Kebab,
    /// `Header-Case`
    Header,
}

impl CaseName {
    /// Returns the converter for this name.
    #[must_use]
    pub fn converter(self) -> CaseConverter {
        match self {
            Self::Identity => CaseConverter::identity(),
            Self::Snake => CaseConverter::snake(),
            Self::Camel => CaseConverter::camel(),
            Self::Pascal => CaseConverter::pascal(),
            Self::Constant => CaseConverter::constant(),
            Self::Kebab => CaseConverter::kebab(),
            Self::Header => CaseConverter::header(),
        }
    }

    /// Lowercase name as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Snake => "snake",
            Self::Camel => "camel",
            Self::Pascal => "pascal",
            Self::Constant => "constant",
            Self::Kebab => "kebab",
            Self::Header => "header",
        }
    }
}

impl FromStr for CaseName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_suffix("_case").unwrap_or(&name);
        match name {
            "identity" | "none" => Ok(Self::Identity),
            "snake" => Ok(Self::Snake),
            "camel" => Ok(Self::Camel),
            "pascal" => Ok(Self::Pascal),
            "constant" => Ok(Self::Constant),
            "kebab" => Ok(Self::Kebab),
            "header" => Ok(Self::Header),
            other => Err(format!("unknown case converter '{other}'")),
        }
    }
}

impl fmt::Display for CaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CaseName> for CaseConverter {
    fn from(name: CaseName) -> Self {
        name.converter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words() {
        assert_eq!(words("myParam"), vec!["my", "Param"]);
        assert_eq!(words("HTTPServer"), vec!["HTTP", "Server"]);
        assert_eq!(words("get_HTTPResponse"), vec!["get", "HTTP", "Response"]);
        assert_eq!(words("  leading--and__trailing "), vec!["leading", "and", "trailing"]);
        assert_eq!(words("version2Beta"), vec!["version2", "Beta"]);
        assert!(words("__").is_empty());
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("myParam"), "my_param");
        assert_eq!(snake_case("MyParam"), "my_param");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("first-name"), "first_name");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(camel_case("FirstName"), "firstName");
        assert_eq!(camel_case("HTTP_SERVER"), "httpServer");
        assert_eq!(camel_case("firstName"), "firstName");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("my_param"), "MyParam");
        assert_eq!(pascal_case("myParam"), "MyParam");
    }

    #[test]
    fn test_constant_case() {
        assert_eq!(constant_case("myParam"), "MY_PARAM");
        assert_eq!(constant_case("my-param value"), "MY_PARAM_VALUE");
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("myParam"), "my-param");
        assert_eq!(kebab_case("My_Param"), "my-param");
    }

    #[test]
    fn test_header_case() {
        assert_eq!(header_case("myParam"), "My-Param");
        assert_eq!(header_case("content_type"), "Content-Type");
        assert_eq!(header_case("X-Request-Id"), "X-Request-Id");
    }

    #[test]
    fn test_converter_identity() {
        let identity = CaseConverter::identity();
        assert!(identity.is_identity());
        assert_eq!(identity.convert("first_name"), "first_name");
        assert_eq!(CaseConverter::default().name(), "identity");
    }

    #[test]
    fn test_case_name_parsing() {
        assert_eq!("camel".parse::<CaseName>(), Ok(CaseName::Camel));
        assert_eq!("Header_Case".parse::<CaseName>(), Ok(CaseName::Header));
        assert_eq!("none".parse::<CaseName>(), Ok(CaseName::Identity));
        assert!("title".parse::<CaseName>().is_err());
        assert_eq!(CaseName::Kebab.converter().convert("a_bc"), "a-bc");
    }

    #[test]
    fn test_case_name_serde() {
        let name: CaseName = serde_json::from_str("\"constant\"").unwrap();
        assert_eq!(name, CaseName::Constant);
        assert_eq!(serde_json::to_string(&CaseName::Snake).unwrap(), "\"snake\"");
    }
}
