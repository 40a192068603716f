//! Backend policies: identifier quoting, placeholder syntax and literal encoding.
//!
//! A [`Dialect`] is a stateless value. Every method is a pure function of its
//! arguments, so one dialect can be shared by any number of concurrent renders.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt::{self, Write};

/// Backend-specific quoting and placeholder rules.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Short backend name, used in logs.
    fn name(&self) -> &'static str;

    /// Quote an identifier. Dotted names are quoted per part.
    fn quote_ident(&self, name: &str) -> String;

    /// Native placeholder for the 0-based `ordinal` within one statement.
    fn placeholder(&self, ordinal: usize) -> String;

    /// `OFFSET ... FETCH` pagination that needs an `ORDER BY` clause.
    fn requires_order_for_offset(&self) -> bool {
        false
    }

    /// Returned columns go in an `OUTPUT INSERTED.*` clause instead of `RETURNING`.
    fn uses_output_clause(&self) -> bool {
        false
    }

    /// Encode a string literal.
    fn encode_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            if ch == '\'' {
                out.push('\'');
            }
            out.push(ch);
        }
        out.push('\'');
        out
    }

    fn encode_bool(&self, b: bool) -> String {
        if b { "1" } else { "0" }.to_string()
    }

    fn encode_time(&self, t: &DateTime<Utc>) -> String {
        format!("'{}'", t.format(TIME_FORMAT))
    }

    fn encode_bytes(&self, b: &[u8]) -> String {
        format!("0x{}", hex(b))
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn hex(b: &[u8]) -> String {
    let mut out = String::with_capacity(b.len() * 2);
    for byte in b {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Quote every `.`-separated part of `name` with `open`/`close`, doubling `close` inside a part.
pub fn quote_dotted(name: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, part) in name.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push(open);
        for ch in part.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }
    out
}

/// MySQL: backtick identifiers, `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_dotted(name, '`', '`')
    }

    fn placeholder(&self, _ordinal: usize) -> String {
        "?".to_string()
    }

    fn encode_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            match ch {
                '\0' => out.push_str("\\0"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\x08' => out.push_str("\\b"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\x1a' => out.push_str("\\Z"),
                '\\' => out.push_str("\\\\"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }
}

/// PostgreSQL: double-quoted identifiers, `$1, $2, ...` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_dotted(name, '"', '"')
    }

    fn placeholder(&self, ordinal: usize) -> String {
        format!("${}", ordinal + 1)
    }

    fn encode_bool(&self, b: bool) -> String {
        if b { "TRUE" } else { "FALSE" }.to_string()
    }

    fn encode_bytes(&self, b: &[u8]) -> String {
        format!("E'\\\\x{}'", hex(b))
    }
}

/// SQLite: double-quoted identifiers, `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_dotted(name, '"', '"')
    }

    fn placeholder(&self, _ordinal: usize) -> String {
        "?".to_string()
    }

    fn encode_bytes(&self, b: &[u8]) -> String {
        format!("X'{}'", hex(b))
    }
}

/// SQL Server: bracketed identifiers, `@p1, @p2, ...` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSql;

impl Dialect for MsSql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_dotted(name, '[', ']')
    }

    fn placeholder(&self, ordinal: usize) -> String {
        format!("@p{}", ordinal + 1)
    }

    fn requires_order_for_offset(&self) -> bool {
        true
    }

    fn uses_output_clause(&self) -> bool {
        true
    }
}

/// Built-in dialect selector, usable from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[serde(alias = "mariadb")]
    Mysql,
    #[default]
    #[serde(alias = "postgresql", alias = "pgx")]
    Postgres,
    #[serde(alias = "sqlite3")]
    Sqlite,
    #[serde(alias = "sqlserver")]
    Mssql,
}

impl DialectKind {
    /// Resolve a database driver name (`mysql`, `postgres`, `pgx`, `sqlite3`, `mssql`, ...).
    pub fn from_driver(driver: &str) -> Option<Self> {
        match driver.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::Mysql),
            "postgres" | "postgresql" | "pgx" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "mssql" | "sqlserver" => Some(Self::Mssql),
            _ => None,
        }
    }

    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Mysql => &MySql,
            Self::Postgres => &Postgres,
            Self::Sqlite => &Sqlite,
            Self::Mssql => &MsSql,
        }
    }
}
