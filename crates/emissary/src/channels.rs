//! Per-channel case converter resolution.
//!
//! Routers and routes each carry a [`CaseOverrides`] table. At call time the
//! two are folded into one [`CaseConverters`] set: route channel, router
//! channel, route default, router default, identity.

use emissary_config::CaseSettings;
use emissary_core::CaseConverter;
use std::fmt;

/// A named case-converted channel of a request or response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Query parameter keys.
    Query,
    /// JSON, form and file body keys.
    Body,
    /// Cookie names.
    Cookie,
    /// Header names.
    Header,
    /// Top-level keys of JSON responses.
    Response,
}

impl Channel {
    /// Every channel.
    pub const ALL: [Self; 5] = [
        Self::Query,
        Self::Body,
        Self::Cookie,
        Self::Header,
        Self::Response,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Query => "query",
            Self::Body => "body",
            Self::Cookie => "cookie",
            Self::Header => "header",
            Self::Response => "response",
        };
        f.write_str(name)
    }
}

/// Optional converters per channel plus a fallback.
///
/// # Example
///
/// ```
/// use emissary::{CaseOverrides, Channel};
/// use emissary_core::CaseConverter;
///
/// let cases = CaseOverrides::new()
///     .default_case(CaseConverter::snake())
///     .channel(Channel::Query, CaseConverter::camel());
///
/// assert_eq!(cases.get(Channel::Query).unwrap().name(), "camel_case");
/// assert!(cases.get(Channel::Body).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CaseOverrides {
    default: Option<CaseConverter>,
    query: Option<CaseConverter>,
    body: Option<CaseConverter>,
    cookie: Option<CaseConverter>,
    header: Option<CaseConverter>,
    response: Option<CaseConverter>,
}

impl CaseOverrides {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback converter.
    #[must_use]
    pub fn default_case(mut self, converter: CaseConverter) -> Self {
        self.default = Some(converter);
        self
    }

    /// Sets the converter of one channel.
    #[must_use]
    pub fn channel(mut self, channel: Channel, converter: CaseConverter) -> Self {
        self.set(channel, Some(converter));
        self
    }

    /// Replaces the converter of one channel.
    pub fn set(&mut self, channel: Channel, converter: Option<CaseConverter>) {
        *self.slot_mut(channel) = converter;
    }

    /// Replaces the fallback converter.
    pub fn set_default(&mut self, converter: Option<CaseConverter>) {
        self.default = converter;
    }

    /// Converter explicitly set for a channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&CaseConverter> {
        match channel {
            Channel::Query => self.query.as_ref(),
            Channel::Body => self.body.as_ref(),
            Channel::Cookie => self.cookie.as_ref(),
            Channel::Header => self.header.as_ref(),
            Channel::Response => self.response.as_ref(),
        }
    }

    /// Fallback converter.
    #[must_use]
    pub fn get_default(&self) -> Option<&CaseConverter> {
        self.default.as_ref()
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<CaseConverter> {
        match channel {
            Channel::Query => &mut self.query,
            Channel::Body => &mut self.body,
            Channel::Cookie => &mut self.cookie,
            Channel::Header => &mut self.header,
            Channel::Response => &mut self.response,
        }
    }
}

impl From<CaseSettings> for CaseOverrides {
    fn from(settings: CaseSettings) -> Self {
        Self {
            default: settings.default.map(Into::into),
            query: settings.query.map(Into::into),
            body: settings.body.map(Into::into),
            cookie: settings.cookie.map(Into::into),
            header: settings.header.map(Into::into),
            response: settings.response.map(Into::into),
        }
    }
}

/// Fully resolved converters, one per channel.
#[derive(Debug, Clone, Default)]
pub struct CaseConverters {
    query: CaseConverter,
    body: CaseConverter,
    cookie: CaseConverter,
    header: CaseConverter,
    response: CaseConverter,
}

impl CaseConverters {
    /// Folds route overrides over router defaults.
    #[must_use]
    pub fn resolve(route: &CaseOverrides, router: &CaseOverrides) -> Self {
        let pick = |channel: Channel| {
            route
                .get(channel)
                .or_else(|| router.get(channel))
                .or_else(|| route.get_default())
                .or_else(|| router.get_default())
                .cloned()
                .unwrap_or_default()
        };
        Self {
            query: pick(Channel::Query),
            body: pick(Channel::Body),
            cookie: pick(Channel::Cookie),
            header: pick(Channel::Header),
            response: pick(Channel::Response),
        }
    }

    /// Converter of one channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> &CaseConverter {
        match channel {
            Channel::Query => &self.query,
            Channel::Body => &self.body,
            Channel::Cookie => &self.cookie,
            Channel::Header => &self.header,
            Channel::Response => &self.response,
        }
    }

    /// Converts `name` for `channel`.
    #[must_use]
    pub fn convert(&self, channel: Channel, name: &str) -> String {
        self.get(channel).convert(name)
    }
}
