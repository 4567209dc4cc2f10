// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping configuration
//!
//! Controls how column overrides are read from field tags and how
//! literals are rendered. Read once when the registry is created.
//!
//! ```toml
//! tag_name = "db"
//! tag_key = "col"
//! tag_separator = "="
//! default_fields_policy = "strict"
//! string_quote = "double"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What the builder does with a non-renderable field when no explicit
/// field list is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldsPolicy {
    /// Fail with a render error.
    #[default]
    Strict,
    /// Leave the field out of the rendered fragment.
    SkipUnrenderable,
}

/// Quote style for text literals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// `"text"` with backslash escapes.
    #[default]
    Double,
    /// `'text'` with embedded quotes doubled (standard SQL).
    Single,
}

/// Mapping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tag name holding column overrides, e.g. `db` in `#[tag(db = "col=x")]`
    pub tag_name: String,

    /// Key of the column override inside the tag value
    pub tag_key: String,

    /// Separator between key and value inside the tag value
    pub tag_separator: String,

    /// Handling of non-renderable fields in the default field set
    pub default_fields_policy: FieldsPolicy,

    /// Quote style for text literals
    pub string_quote: QuoteStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tag_name: "db".to_string(),
            tag_key: "col".to_string(),
            tag_separator: "=".to_string(),
            default_fields_policy: FieldsPolicy::Strict,
            string_quote: QuoteStyle::Double,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tag_name.is_empty() {
            return Err(ConfigError::Invalid("tag_name is empty".into()));
        }
        if self.tag_key.is_empty() {
            return Err(ConfigError::Invalid("tag_key is empty".into()));
        }
        if self.tag_separator.is_empty() {
            return Err(ConfigError::Invalid("tag_separator is empty".into()));
        }
        // Tag values are split on whitespace before the separator is applied.
        if self.tag_separator.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "tag_separator {:?} contains whitespace",
                self.tag_separator
            )));
        }
        Ok(())
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    tag_name: Option<String>,
    tag_key: Option<String>,
    tag_separator: Option<String>,
    default_fields_policy: Option<FieldsPolicy>,
    string_quote: Option<QuoteStyle>,
}

impl ConfigBuilder {
    /// Set the tag name (default: `db`)
    pub fn tag_name(mut self, name: impl Into<String>) -> Self {
        self.tag_name = Some(name.into());
        self
    }

    /// Set the column key (default: `col`)
    pub fn tag_key(mut self, key: impl Into<String>) -> Self {
        self.tag_key = Some(key.into());
        self
    }

    /// Set the key/value separator (default: `=`)
    pub fn tag_separator(mut self, separator: impl Into<String>) -> Self {
        self.tag_separator = Some(separator.into());
        self
    }

    /// Set the default field set policy (default: strict)
    pub fn default_fields_policy(mut self, policy: FieldsPolicy) -> Self {
        self.default_fields_policy = Some(policy);
        self
    }

    /// Set the text quote style (default: double)
    pub fn string_quote(mut self, quote: QuoteStyle) -> Self {
        self.string_quote = Some(quote);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        let defaults = Config::default();

        Config {
            tag_name: self.tag_name.unwrap_or(defaults.tag_name),
            tag_key: self.tag_key.unwrap_or(defaults.tag_key),
            tag_separator: self.tag_separator.unwrap_or(defaults.tag_separator),
            default_fields_policy: self
                .default_fields_policy
                .unwrap_or(defaults.default_fields_policy),
            string_quote: self.string_quote.unwrap_or(defaults.string_quote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .tag_name("sql")
            .tag_key("column")
            .tag_separator(":")
            .default_fields_policy(FieldsPolicy::SkipUnrenderable)
            .string_quote(QuoteStyle::Single)
            .build();

        assert_eq!(config.tag_name, "sql");
        assert_eq!(config.tag_key, "column");
        assert_eq!(config.tag_separator, ":");
        assert_eq!(config.default_fields_policy, FieldsPolicy::SkipUnrenderable);
        assert_eq!(config.string_quote, QuoteStyle::Single);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.tag_name, "db");
        assert_eq!(config.tag_key, "col");
        assert_eq!(config.tag_separator, "=");
        assert_eq!(config.default_fields_policy, FieldsPolicy::Strict);
        assert_eq!(config.string_quote, QuoteStyle::Double);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            tag_key = "column"
            string_quote = "single"
            "#,
        )
        .unwrap();

        assert_eq!(config.tag_name, "db");
        assert_eq!(config.tag_key, "column");
        assert_eq!(config.string_quote, QuoteStyle::Single);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let err = Config::from_toml_str("tag_name = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = Config::builder().tag_separator(" = ").build();
        assert!(config.validate().is_err());

        let err = Config::from_toml_str("default_fields_policy = \"lenient\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_fields_policy = \"skip_unrenderable\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.default_fields_policy, FieldsPolicy::SkipUnrenderable);

        assert!(matches!(
            Config::from_file("/nonexistent/rowbind.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
