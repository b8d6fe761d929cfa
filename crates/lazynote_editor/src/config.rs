//! Editor session configuration.
//!
//! # Responsibility
//! - Describe tunables of the editor session (debounce delays, slug length,
//!   paste behavior, history depth, log level).
//! - Decode configuration from JSON host payloads.
//!
//! # Invariants
//! - Every field has a default, so partial payloads are accepted.
//! - Decoded configuration is validated before use.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_OUTLINE_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Editor session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Delay before the outline is re-extracted after an edit.
    pub outline_debounce_ms: u64,
    /// Delay before the document is handed to the persistence sink.
    pub autosave_debounce_ms: u64,
    /// Maximum length of the slug part of derived heading ids.
    pub slug_max_chars: usize,
    /// Whether pasted text is checked for markdown.
    pub markdown_paste: bool,
    /// Undo entries kept before the oldest is dropped.
    pub history_limit: usize,
    /// Log level for hosts that initialize logging from this config.
    pub log_level: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            outline_debounce_ms: DEFAULT_OUTLINE_DEBOUNCE_MS,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            slug_max_chars: crate::outline::DEFAULT_SLUG_MAX_CHARS,
            markdown_paste: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_level: None,
        }
    }
}

impl EditorConfig {
    /// Decodes and validates a JSON configuration payload.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Decode(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slug_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "slug_max_chars",
                reason: "must be greater than zero",
            });
        }
        if self.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history_limit",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    pub fn outline_delay(&self) -> Duration {
        Duration::from_millis(self.outline_debounce_ms)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Configured log level, or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or(crate::logging::default_log_level())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Payload is not valid JSON for this schema.
    Decode(String),
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(message) => write!(f, "invalid editor config: {message}"),
            Self::InvalidValue { field, reason } => write!(f, "config `{field}` {reason}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EditorConfig};
    use std::time::Duration;

    #[test]
    fn partial_payload_keeps_defaults() {
        let config = EditorConfig::from_json_str(r#"{"outline_debounce_ms": 50}"#)
            .expect("partial config should decode");
        assert_eq!(config.outline_delay(), Duration::from_millis(50));
        assert_eq!(config.autosave_delay(), Duration::from_millis(1000));
        assert_eq!(config.slug_max_chars, 50);
        assert!(config.markdown_paste);
    }

    #[test]
    fn rejects_zero_limits_and_unknown_fields() {
        let err = EditorConfig::from_json_str(r#"{"history_limit": 0}"#)
            .expect_err("zero history must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "history_limit",
                ..
            }
        ));

        let err = EditorConfig::from_json_str(r#"{"autosave": true}"#)
            .expect_err("unknown field must fail");
        assert!(matches!(err, ConfigError::Decode(_)));
    }

    #[test]
    fn log_level_falls_back_to_build_default() {
        let config = EditorConfig::default();
        assert_eq!(
            config.effective_log_level(),
            crate::logging::default_log_level()
        );
        let config = EditorConfig::from_json_str(r#"{"log_level": "warn"}"#).expect("decode");
        assert_eq!(config.effective_log_level(), "warn");
    }
}
