//! Placeholder interpolation.
//!
//! Fragments render generic `?` sentinels. This module rewrites them into the
//! dialect's native placeholders (or inline literals, for debugging), expanding
//! list args and nested fragments on the way. Ordinals are shared across the whole
//! statement, so a nested sub-query continues the parent's `$n` numbering.

use crate::buffer::{Arg, Buffer, ESCAPED_PLACEHOLDER, PLACEHOLDER};
use crate::config::SqlLogConfig;
use crate::dialect::Dialect;
use crate::error::{RenderError, RenderResult};
use crate::fragment::{BuiltQuery, Fragment};
use crate::value::Value;
use tracing::Level;

/// Render `fragment` and interpolate it with native placeholders.
pub fn build(fragment: &dyn Fragment, dialect: &dyn Dialect) -> RenderResult<BuiltQuery> {
    build_with(fragment, dialect, &SqlLogConfig::default())
}

/// Like [`build`], logging the result per `config`.
pub fn build_with(
    fragment: &dyn Fragment,
    dialect: &dyn Dialect,
    config: &SqlLogConfig,
) -> RenderResult<BuiltQuery> {
    let mut buf = Buffer::new();
    fragment.render(dialect, &mut buf)?;
    let built = interpolate(dialect, buf.sql(), buf.args())?;
    if config.enabled {
        log_built(dialect, &built, config);
    }
    Ok(built)
}

fn log_built(dialect: &dyn Dialect, built: &BuiltQuery, config: &SqlLogConfig) {
    macro_rules! emit_at_level {
        ($level:expr, $($field:tt)*) => {
            match $level {
                Level::ERROR => tracing::error!($($field)*),
                Level::WARN  => tracing::warn!($($field)*),
                Level::INFO  => tracing::info!($($field)*),
                Level::DEBUG => tracing::debug!($($field)*),
                Level::TRACE => tracing::trace!($($field)*),
            }
        };
    }

    let sql = config.truncate(&built.sql);
    emit_at_level!(
        config.level,
        target: "sqlfrag.sql",
        dialect = dialect.name(),
        param_count = built.values.len(),
        sql = %sql,
    );
}

/// Rewrite `sql` with native placeholders, returning the flattened value list.
///
/// When every arg is a scalar the output values equal the input args, in order.
pub fn interpolate(dialect: &dyn Dialect, sql: &str, args: &[Arg]) -> RenderResult<BuiltQuery> {
    let mut out = Interpolator::new(dialect, Mode::Placeholder);
    out.run(sql, args)?;
    Ok(BuiltQuery {
        sql: out.sql,
        values: out.values,
    })
}

/// Rewrite `sql` with every value inlined as a dialect literal.
///
/// The result is meant for logs. Execute [`interpolate`]d statements instead.
pub fn interpolate_literal(dialect: &dyn Dialect, sql: &str, args: &[Arg]) -> RenderResult<String> {
    let mut out = Interpolator::new(dialect, Mode::Literal);
    out.run(sql, args)?;
    Ok(out.sql)
}

/// Count unescaped placeholders in `sql`.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut rest = sql;
    while let Some(index) = rest.find(PLACEHOLDER) {
        if rest[index..].starts_with(ESCAPED_PLACEHOLDER) {
            rest = &rest[index + ESCAPED_PLACEHOLDER.len()..];
            continue;
        }
        count += 1;
        rest = &rest[index + PLACEHOLDER.len()..];
    }
    count
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Placeholder,
    Literal,
}

struct Interpolator<'d> {
    dialect: &'d dyn Dialect,
    mode: Mode,
    sql: String,
    values: Vec<Value>,
    ordinal: usize,
}

impl<'d> Interpolator<'d> {
    fn new(dialect: &'d dyn Dialect, mode: Mode) -> Self {
        Self {
            dialect,
            mode,
            sql: String::new(),
            values: Vec::new(),
            ordinal: 0,
        }
    }

    fn run(&mut self, sql: &str, args: &[Arg]) -> RenderResult<()> {
        self.sql.reserve(sql.len());
        let mut rest = sql;
        let mut next = 0;

        while let Some(index) = rest.find(PLACEHOLDER) {
            if rest[index..].starts_with(ESCAPED_PLACEHOLDER) {
                // `??` is written once
                self.sql.push_str(&rest[..index + PLACEHOLDER.len()]);
                rest = &rest[index + ESCAPED_PLACEHOLDER.len()..];
                continue;
            }

            let Some(arg) = args.get(next) else {
                return Err(RenderError::PlaceholderCount {
                    expected: args.len(),
                    found: count_placeholders(sql),
                });
            };
            self.sql.push_str(&rest[..index]);
            self.write_arg(arg)?;
            next += 1;
            rest = &rest[index + PLACEHOLDER.len()..];
        }
        self.sql.push_str(rest);

        if next != args.len() {
            return Err(RenderError::PlaceholderCount {
                expected: args.len(),
                found: next,
            });
        }
        Ok(())
    }

    fn write_arg(&mut self, arg: &Arg) -> RenderResult<()> {
        match arg {
            Arg::Value(value) => self.write_value(value),
            Arg::List(values) => {
                if values.is_empty() {
                    self.sql.push_str("(NULL)");
                    return Ok(());
                }
                self.sql.push('(');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.write_value(value);
                }
                self.sql.push(')');
            }
            Arg::Fragment(fragment) => {
                let mut nested = Buffer::new();
                fragment.render(self.dialect, &mut nested)?;
                let subquery = fragment.is_subquery();
                if subquery {
                    self.sql.push('(');
                }
                self.run(nested.sql(), nested.args())?;
                if subquery {
                    self.sql.push(')');
                }
            }
        }
        Ok(())
    }

    fn write_value(&mut self, value: &Value) {
        match self.mode {
            Mode::Placeholder => {
                self.sql.push_str(&self.dialect.placeholder(self.ordinal));
                self.ordinal += 1;
                self.values.push(value.clone());
            }
            Mode::Literal => {
                let literal = encode_literal(self.dialect, value);
                self.sql.push_str(&literal);
            }
        }
    }
}

fn encode_literal(dialect: &dyn Dialect, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => dialect.encode_bool(*b),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => dialect.encode_string(s),
        Value::Bytes(b) => dialect.encode_bytes(b),
        Value::Json(j) => dialect.encode_string(&j.to_string()),
        Value::Timestamp(t) => dialect.encode_time(t),
        Value::Uuid(u) => dialect.encode_string(&u.to_string()),
    }
}
