//! Runtime configuration: dialect selection and SQL logging.
//!
//! Both types deserialize with serde, so they can be embedded in an application's
//! own TOML or JSON configuration:
//!
//! ```toml
//! [database]
//! dialect = "postgres"
//!
//! [database.log]
//! level = "info"
//! max_sql_length = 500
//! ```

use crate::dialect::{Dialect, DialectKind};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use tracing::Level;

/// Controls the `tracing` event emitted each time a statement is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqlLogConfig {
    /// Whether built statements are logged at all.
    pub enabled: bool,
    /// Tracing event level to emit at.
    #[serde(deserialize_with = "deserialize_level")]
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable statement logging.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Override the tracing event level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Level::from_str(&raw).map_err(|_| serde::de::Error::custom(format!("invalid log level: {raw}")))
}

/// Top-level settings for an application using sqlfrag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dialect: DialectKind,
    pub log: SqlLogConfig,
}

impl Settings {
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect.dialect()
    }
}
