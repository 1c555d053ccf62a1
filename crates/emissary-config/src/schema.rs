//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use emissary_core::CaseName;
use emissary_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Router configuration section.
///
/// # Example
///
/// ```
/// use emissary_config::RouterSettings;
///
/// let settings = RouterSettings {
///     host: "https://api.example.com".to_string(),
///     port: Some(8443),
///     ..Default::default()
/// };
/// assert!(settings.rate_limit.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouterSettings {
    /// Scheme and host, e.g. `https://api.example.com`.
    #[serde(default = "default_host")]
    pub host: String,

    /// Optional port appended to the host.
    #[serde(default)]
    pub port: Option<u16>,

    /// Token-bucket throttle shared by every route of the router.
    #[serde(default)]
    pub rate_limit: Option<RateLimitSettings>,

    /// Default case converters per channel.
    #[serde(default)]
    pub cases: CaseSettings,

    /// Request timeout of the default transport, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            rate_limit: None,
            cases: CaseSettings::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "http://localhost".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Rate limit configuration: at most `calls` requests per `period_secs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSettings {
    /// Requests allowed per period.
    pub calls: u32,

    /// Period length in seconds.
    #[serde(default = "default_period_secs")]
    pub period_secs: f64,
}

fn default_period_secs() -> f64 {
    1.0
}

/// Per-channel case converter defaults.
///
/// Unset channels fall back to `default`, then to identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CaseSettings {
    /// Fallback for every channel.
    #[serde(default)]
    pub default: Option<CaseName>,
    /// Query parameter keys.
    #[serde(default)]
    pub query: Option<CaseName>,
    /// JSON and form body keys.
    #[serde(default)]
    pub body: Option<CaseName>,
    /// Cookie names.
    #[serde(default)]
    pub cookie: Option<CaseName>,
    /// Header names.
    #[serde(default)]
    pub header: Option<CaseName>,
    /// Keys of JSON responses.
    #[serde(default)]
    pub response: Option<CaseName>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info", "emissary=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,

    /// Service name recorded in the first log line.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
            service_name: default_service_name(),
        }
    }
}

impl LoggingSettings {
    /// Converts the section into a telemetry [`LogConfig`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            file_line_info: self.include_location,
            service_name: self.service_name.clone(),
            ..LogConfig::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "emissary".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_defaults() {
        let settings = RouterSettings::default();
        assert_eq!(settings.host, "http://localhost");
        assert_eq!(settings.port, None);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.cases, CaseSettings::default());
    }

    #[test]
    fn test_cases_deserialize() {
        let cases: CaseSettings = toml::from_str(
            r#"
            default = "snake"
            query = "camel"
            header = "header"
        "#,
        )
        .unwrap();
        assert_eq!(cases.default, Some(CaseName::Snake));
        assert_eq!(cases.query, Some(CaseName::Camel));
        assert_eq!(cases.header, Some(CaseName::Header));
        assert_eq!(cases.body, None);
    }

    #[test]
    fn test_rate_limit_default_period() {
        let limit: RateLimitSettings = toml::from_str("calls = 5").unwrap();
        assert_eq!(limit.calls, 5);
        assert!((limit.period_secs - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_logging_to_log_config() {
        let settings = LoggingSettings {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Default::default()
        };
        let config = settings.to_log_config();
        assert_eq!(config.level, "debug");
        assert!(!config.json_format);
        assert!(config.file_line_info);
        assert_eq!(config.service_name, "emissary");
    }
}
