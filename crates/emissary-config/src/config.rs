//! Main configuration types.
//!
//! This module provides the top-level [`EmissaryConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LoggingSettings, RouterSettings};

/// Complete Emissary configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use emissary_config::EmissaryConfig;
///
/// let config = EmissaryConfig::default();
/// assert_eq!(config.router.host, "http://localhost");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EmissaryConfig {
    /// Router configuration.
    #[serde(default)]
    pub router: RouterSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EmissaryConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> EmissaryConfigBuilder {
        EmissaryConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSetting` if:
    /// - The host is empty
    /// - The port is 0
    /// - A rate limit allows 0 calls or has a non-positive period
    /// - The request timeout is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        let router = &self.router;

        if router.host.trim().is_empty() {
            return Err(ConfigError::setting("router.host", "must not be empty"));
        }

        if router.port == Some(0) {
            return Err(ConfigError::setting(
                "router.port",
                "must be between 1 and 65535",
            ));
        }

        if let Some(limit) = &router.rate_limit {
            if limit.calls == 0 {
                return Err(ConfigError::setting(
                    "router.rate_limit.calls",
                    "must be greater than 0",
                ));
            }
            if !(limit.period_secs.is_finite() && limit.period_secs > 0.0) {
                return Err(ConfigError::setting(
                    "router.rate_limit.period_secs",
                    "must be a positive number of seconds",
                ));
            }
        }

        if router.timeout_secs == 0 {
            return Err(ConfigError::setting(
                "router.timeout_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }
}

/// Builder for [`EmissaryConfig`].
#[derive(Debug, Default)]
pub struct EmissaryConfigBuilder {
    router: Option<RouterSettings>,
    logging: Option<LoggingSettings>,
}

impl EmissaryConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the router configuration.
    #[must_use]
    pub fn router(mut self, router: RouterSettings) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSettings) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> EmissaryConfig {
        EmissaryConfig {
            router: self.router.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<EmissaryConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RateLimitSettings;

    fn with_router(router: RouterSettings) -> EmissaryConfig {
        EmissaryConfig::builder().router(router).build()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(EmissaryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_host() {
        let config = with_router(RouterSettings {
            host: "  ".to_string(),
            ..Default::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("router.host"));
    }

    #[test]
    fn test_validate_zero_port() {
        let config = with_router(RouterSettings {
            port: Some(0),
            ..Default::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("router.port"));
    }

    #[test]
    fn test_validate_rate_limit() {
        let zero_calls = with_router(RouterSettings {
            rate_limit: Some(RateLimitSettings {
                calls: 0,
                period_secs: 1.0,
            }),
            ..Default::default()
        });
        assert!(zero_calls
            .validate()
            .unwrap_err()
            .to_string()
            .contains("rate_limit.calls"));

        let negative_period = with_router(RouterSettings {
            rate_limit: Some(RateLimitSettings {
                calls: 10,
                period_secs: -1.0,
            }),
            ..Default::default()
        });
        assert!(negative_period
            .validate()
            .unwrap_err()
            .to_string()
            .contains("period_secs"));
    }

    #[test]
    fn test_presets() {
        let dev = EmissaryConfig::development();
        assert_eq!(dev.logging.level, "debug");
        assert_eq!(dev.logging.format, LogFormat::Pretty);

        let prod = EmissaryConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert!(!prod.logging.include_location);
    }

    #[test]
    fn test_build_validated_failure() {
        let result = EmissaryConfig::builder()
            .router(RouterSettings {
                timeout_secs: 0,
                ..Default::default()
            })
            .build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&EmissaryConfig::default()).unwrap();
        assert!(toml_str.contains("[router]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [router]
            host = "https://api.test"
            retries = 3
        "#;
        let result: Result<EmissaryConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
