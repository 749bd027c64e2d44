// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the query error boundary.
//!
//! [`BoundaryConfig`] holds the error handler policy and the logging
//! settings. The helpers load it from TOML, apply `QEB_*` environment
//! overrides, merge overlays, and report advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Raw fault text and source chains will be sent to clients.
    FaultDetailsExposed,
    /// Clients will not see `extensions.code` on error records.
    ClassificationCodeHidden,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::FaultDetailsExposed => f.write_str(
                "error_handler.include_fault_details is enabled: internal fault text reaches clients",
            ),
            ConfigWarning::ClassificationCodeHidden => f.write_str(
                "error_handler.expose_classification_code is disabled: clients cannot tell error categories apart",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Message used for unexpected faults when none is configured.
pub const DEFAULT_UNEXPECTED_MESSAGE: &str = "Unexpected Execution Error";

/// Log level used when none is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Top-level configuration for the query error boundary.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BoundaryConfig {
    /// Policy for the default error handler.
    #[serde(default)]
    pub error_handler: ErrorHandlerConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the default error handler.
///
/// Every field is optional so that partial files can be layered with
/// [`merge_configs`]; the accessor methods resolve defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlerConfig {
    /// Attach fault text and its source chain to unexpected errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_fault_details: Option<bool>,

    /// Message shown to clients for unexpected faults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unexpected_message: Option<String>,

    /// Add `extensions.code` to records that lack one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_classification_code: Option<bool>,
}

impl ErrorHandlerConfig {
    /// Resolved `include_fault_details` (default `false`).
    pub fn include_fault_details(&self) -> bool {
        self.include_fault_details.unwrap_or(false)
    }

    /// Resolved `unexpected_message` (default [`DEFAULT_UNEXPECTED_MESSAGE`]).
    pub fn unexpected_message(&self) -> &str {
        self.unexpected_message
            .as_deref()
            .unwrap_or(DEFAULT_UNEXPECTED_MESSAGE)
    }

    /// Resolved `expose_classification_code` (default `true`).
    pub fn expose_classification_code(&self) -> bool {
        self.expose_classification_code.unwrap_or(true)
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Log output settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
}

impl LoggingConfig {
    /// Resolved level (default [`DEFAULT_LOG_LEVEL`]).
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Resolved format (default [`LogFormat::Text`]).
    pub fn format(&self) -> LogFormat {
        self.format.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`BoundaryConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`BoundaryConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<BoundaryConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => BoundaryConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`BoundaryConfig`].
pub fn parse_toml(content: &str) -> Result<BoundaryConfig, ConfigError> {
    toml::from_str::<BoundaryConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `QEB_INCLUDE_FAULT_DETAILS`
/// - `QEB_UNEXPECTED_MESSAGE`
/// - `QEB_EXPOSE_CLASSIFICATION_CODE`
/// - `QEB_LOG_LEVEL`
/// - `QEB_LOG_FORMAT`
pub fn apply_env_overrides(config: &mut BoundaryConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides read through `lookup` instead of the process environment.
///
/// Boolean and format values that do not parse are ignored.
pub fn apply_overrides_from(config: &mut BoundaryConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(flag) = lookup("QEB_INCLUDE_FAULT_DETAILS").and_then(|v| parse_flag(&v)) {
        config.error_handler.include_fault_details = Some(flag);
    }
    if let Some(val) = lookup("QEB_UNEXPECTED_MESSAGE") {
        config.error_handler.unexpected_message = Some(val);
    }
    if let Some(flag) = lookup("QEB_EXPOSE_CLASSIFICATION_CODE").and_then(|v| parse_flag(&v)) {
        config.error_handler.expose_classification_code = Some(flag);
    }
    if let Some(val) = lookup("QEB_LOG_LEVEL") {
        config.logging.level = Some(val);
    }
    if let Some(format) = lookup("QEB_LOG_FORMAT").and_then(|v| parse_format(&v)) {
        config.logging.format = Some(format);
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_format(raw: &str) -> Option<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "text" => Some(LogFormat::Text),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (blank unexpected message, unknown log level) are returned as
/// a [`ConfigError::ValidationError`]; soft issues come back as warnings.
pub fn validate_config(config: &BoundaryConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref msg) = config.error_handler.unexpected_message {
        if msg.trim().is_empty() {
            errors.push("error_handler.unexpected_message must not be blank".into());
        }
    }

    let level = config.logging.level();
    if !VALID_LOG_LEVELS.contains(&level) {
        errors.push(format!("invalid logging.level '{level}'"));
    }

    if config.error_handler.include_fault_details() {
        warnings.push(ConfigWarning::FaultDetailsExposed);
    }
    if !config.error_handler.expose_classification_code() {
        warnings.push(ConfigWarning::ClassificationCodeHidden);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations.  Values set in `overlay` take precedence over
/// `base`; unset overlay values keep the base value.
pub fn merge_configs(base: BoundaryConfig, overlay: BoundaryConfig) -> BoundaryConfig {
    BoundaryConfig {
        error_handler: ErrorHandlerConfig {
            include_fault_details: overlay
                .error_handler
                .include_fault_details
                .or(base.error_handler.include_fault_details),
            unexpected_message: overlay
                .error_handler
                .unexpected_message
                .or(base.error_handler.unexpected_message),
            expose_classification_code: overlay
                .error_handler
                .expose_classification_code
                .or(base.error_handler.expose_classification_code),
        },
        logging: LoggingConfig {
            level: overlay.logging.level.or(base.logging.level),
            format: overlay.logging.format.or(base.logging.format),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
