//! Errors raised while loading router configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("no configuration file at {}", path.display())]
    Missing {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read configuration file {}", path.display())]
    Unreadable {
        /// Path of the file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The content does not parse, or names an unknown setting.
    #[error("malformed {format} configuration: {message}")]
    Malformed {
        /// `TOML` or `JSON`.
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// Only TOML and JSON are read.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A router or logging setting is out of range.
    #[error("invalid setting {field}: {reason}")]
    InvalidSetting {
        /// Dotted setting path, e.g. `router.port`.
        field: &'static str,
        /// The accepted range.
        reason: &'static str,
    },

    /// An environment override could not be applied.
    #[error("cannot apply {var}: {reason}")]
    EnvOverride {
        /// Variable name.
        var: String,
        /// Expected value.
        reason: String,
    },

    /// The `.env` file exists but could not be loaded.
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    pub(crate) const fn setting(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidSetting { field, reason }
    }

    pub(crate) fn env_override(var: &str, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Malformed {
            format: "TOML",
            message: err.message().to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed {
            format: "JSON",
            message: err.to_string(),
        }
    }
}
