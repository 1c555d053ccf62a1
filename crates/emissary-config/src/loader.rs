//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use emissary_core::CaseName;

use crate::{ConfigError, EmissaryConfig, LogFormat, RateLimitSettings};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values
/// 2. Configuration file or string (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use emissary_config::ConfigLoader;
///
/// # fn main() -> Result<(), emissary_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("emissary.toml")?
///     .with_env_prefix("EMISSARY")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: EmissaryConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EmissaryConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = EmissaryConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use emissary_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = EmissaryConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = EmissaryConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format (TOML or JSON) is chosen by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use emissary_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [router]
    ///     host = "https://api.example.com"
    ///     port = 8443
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.router.port, Some(8443));
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::UnsupportedFormat(format.to_string())),
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `EMISSARY__ROUTER__HOST=https://api.example.com` or
    /// `EMISSARY__ROUTER__CASES__QUERY=camel`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the current directory, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides, validate, and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable does not parse or
    /// validation fails.
    pub fn load(self) -> Result<EmissaryConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable does not parse.
    pub fn load_unvalidated(mut self) -> Result<EmissaryConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: BTreeMap<String, String> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            self.apply_env_overrides(&prefix, &vars)?;
        }
        Ok(self.config)
    }

    fn parse_file(content: &str, path: &Path) -> Result<EmissaryConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn apply_env_overrides(
        &mut self,
        prefix: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            self.apply_env_var(key, value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            return Ok(());
        };

        let parts: Vec<&str> = rest.split("__").collect();
        let router = &mut self.config.router;
        let logging = &mut self.config.logging;

        match parts.as_slice() {
            ["ROUTER", "HOST"] => router.host = value.to_string(),
            ["ROUTER", "PORT"] => {
                router.port = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        ConfigError::env_override(key, "expected integer in 1..=65535")
                    })?)
                };
            }
            ["ROUTER", "TIMEOUT_SECS"] => {
                router.timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_override(key, "expected integer"))?;
            }
            ["ROUTER", "RATE_LIMIT", "CALLS"] => {
                let calls = value
                    .parse()
                    .map_err(|_| ConfigError::env_override(key, "expected integer"))?;
                router
                    .rate_limit
                    .get_or_insert_with(|| RateLimitSettings {
                        calls,
                        period_secs: 1.0,
                    })
                    .calls = calls;
            }
            ["ROUTER", "RATE_LIMIT", "PERIOD_SECS"] => {
                let period_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_override(key, "expected number"))?;
                router
                    .rate_limit
                    .get_or_insert_with(|| RateLimitSettings {
                        calls: 1,
                        period_secs,
                    })
                    .period_secs = period_secs;
            }
            ["ROUTER", "CASES", channel] => {
                let case = if value.is_empty() {
                    None
                } else {
                    Some(
                        CaseName::from_str(value)
                            .map_err(|reason| ConfigError::env_override(key, reason))?,
                    )
                };
                let cases = &mut router.cases;
                match *channel {
                    "DEFAULT" => cases.default = case,
                    "QUERY" => cases.query = case,
                    "BODY" => cases.body = case,
                    "COOKIE" => cases.cookie = case,
                    "HEADER" => cases.header = case,
                    "RESPONSE" => cases.response = case,
                    _ => {}
                }
            }

            ["LOGGING", "ENABLED"] => {
                logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_override(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_override(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                logging.include_location = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_override(key, "expected boolean"))?;
            }
            ["LOGGING", "SERVICE_NAME"] => logging.service_name = value.to_string(),

            // Unknown keys are ignored
            _ => {}
        }

        Ok(())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
