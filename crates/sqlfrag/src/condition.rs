//! Boolean conditions for WHERE / HAVING / JOIN ... ON.
//!
//! Column names are quoted by the dialect at render time. Values are bound through
//! placeholders, never inlined.
//!
//! ```ignore
//! use sqlfrag::condition::{and, eq, gt, in_list, or};
//!
//! let cond = and(vec![
//!     eq("status", "active"),
//!     or(vec![gt("age", 18), in_list("role", vec!["admin", "owner"])]),
//! ]);
//! ```

use crate::buffer::{Arg, Buffer, IntoArg};
use crate::dialect::Dialect;
use crate::error::RenderResult;
use crate::fragment::{Expr, Fragment, FragmentRef};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Condition tree node.
#[derive(Clone)]
pub enum Condition {
    /// All operands must hold.
    And(Vec<Condition>),

    /// At least one operand must hold.
    Or(Vec<Condition>),

    /// Negate the inner condition.
    Not(Box<Condition>),

    /// `column op ?`
    Compare {
        column: String,
        op: &'static str,
        value: Arg,
    },

    /// `column IS [NOT] NULL`
    NullCheck { column: String, is_null: bool },

    /// `column [NOT] IN (...)`; the arg is a list or a sub-query.
    In {
        column: String,
        values: Arg,
        negated: bool,
    },

    /// `column [NOT] BETWEEN ? AND ?`
    Between {
        column: String,
        from: Arg,
        to: Arg,
        negated: bool,
    },

    /// Any other fragment, rendered as-is.
    Fragment(FragmentRef),

    /// Always true (`1=1`).
    True,

    /// Always false (`1=0`).
    False,
}

pub fn and(conds: Vec<Condition>) -> Condition {
    Condition::And(conds)
}

pub fn or(conds: Vec<Condition>) -> Condition {
    Condition::Or(conds)
}

pub fn not(cond: Condition) -> Condition {
    Condition::Not(Box::new(cond))
}

fn compare(column: impl Into<String>, op: &'static str, value: impl IntoArg) -> Condition {
    Condition::Compare {
        column: column.into(),
        op,
        value: value.into_arg(),
    }
}

/// `column = value`; a NULL value renders `column IS NULL`.
pub fn eq(column: impl Into<String>, value: impl IntoArg) -> Condition {
    match value.into_arg() {
        Arg::Value(Value::Null) => is_null(column),
        value => compare(column, "=", value),
    }
}

/// `column != value`; a NULL value renders `column IS NOT NULL`.
pub fn neq(column: impl Into<String>, value: impl IntoArg) -> Condition {
    match value.into_arg() {
        Arg::Value(Value::Null) => is_not_null(column),
        value => compare(column, "!=", value),
    }
}

pub fn gt(column: impl Into<String>, value: impl IntoArg) -> Condition {
    compare(column, ">", value)
}

pub fn gte(column: impl Into<String>, value: impl IntoArg) -> Condition {
    compare(column, ">=", value)
}

pub fn lt(column: impl Into<String>, value: impl IntoArg) -> Condition {
    compare(column, "<", value)
}

pub fn lte(column: impl Into<String>, value: impl IntoArg) -> Condition {
    compare(column, "<=", value)
}

pub fn like(column: impl Into<String>, pattern: impl IntoArg) -> Condition {
    compare(column, "LIKE", pattern)
}

pub fn not_like(column: impl Into<String>, pattern: impl IntoArg) -> Condition {
    compare(column, "NOT LIKE", pattern)
}

pub fn is_null(column: impl Into<String>) -> Condition {
    Condition::NullCheck {
        column: column.into(),
        is_null: true,
    }
}

pub fn is_not_null(column: impl Into<String>) -> Condition {
    Condition::NullCheck {
        column: column.into(),
        is_null: false,
    }
}

fn membership(column: impl Into<String>, values: impl IntoArg, negated: bool) -> Condition {
    let values = match values.into_arg() {
        Arg::List(list) if list.is_empty() => {
            return if negated {
                Condition::True
            } else {
                Condition::False
            };
        }
        Arg::Value(v) => Arg::List(vec![v]),
        other => other,
    };
    Condition::In {
        column: column.into(),
        values,
        negated,
    }
}

/// `column IN (...)`; accepts a `Vec` or a sub-query. An empty list renders `1=0`.
pub fn in_list(column: impl Into<String>, values: impl IntoArg) -> Condition {
    membership(column, values, false)
}

/// `column NOT IN (...)`. An empty list renders `1=1`.
pub fn not_in(column: impl Into<String>, values: impl IntoArg) -> Condition {
    membership(column, values, true)
}

pub fn between(column: impl Into<String>, from: impl IntoArg, to: impl IntoArg) -> Condition {
    Condition::Between {
        column: column.into(),
        from: from.into_arg(),
        to: to.into_arg(),
        negated: false,
    }
}

pub fn not_between(column: impl Into<String>, from: impl IntoArg, to: impl IntoArg) -> Condition {
    Condition::Between {
        column: column.into(),
        from: from.into_arg(),
        to: to.into_arg(),
        negated: true,
    }
}

impl Condition {
    /// Wrap an arbitrary fragment.
    pub fn fragment(fragment: impl Fragment + 'static) -> Self {
        Condition::Fragment(Arc::new(fragment))
    }

    /// `self AND other`, flattening into an existing AND group.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut conds) => {
                conds.push(other);
                Condition::And(conds)
            }
            cond => Condition::And(vec![cond, other]),
        }
    }

    /// `self OR other`, flattening into an existing OR group.
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut conds) => {
                conds.push(other);
                Condition::Or(conds)
            }
            cond => Condition::Or(vec![cond, other]),
        }
    }
}

/// Render `parts` joined by `sep`, skipping empty ones.
///
/// With two or more non-empty parts every part is parenthesised; a single part is
/// written bare.
pub(crate) fn render_joined<F: Fragment>(
    parts: &[F],
    sep: &str,
    dialect: &dyn Dialect,
    buf: &mut Buffer,
) -> RenderResult<()> {
    let live: Vec<&F> = parts.iter().filter(|p| !p.is_empty()).collect();
    let wrap = live.len() > 1;
    for (i, part) in live.into_iter().enumerate() {
        if i > 0 {
            buf.write_str(sep);
        }
        if wrap {
            buf.write_char('(');
        }
        part.render(dialect, buf)?;
        if wrap {
            buf.write_char(')');
        }
    }
    Ok(())
}

impl Fragment for Condition {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        match self {
            Condition::And(conds) => render_joined(conds, " AND ", dialect, buf)?,
            Condition::Or(conds) => render_joined(conds, " OR ", dialect, buf)?,
            Condition::Not(inner) => {
                if !inner.is_empty() {
                    buf.write_str("NOT (");
                    inner.render(dialect, buf)?;
                    buf.write_char(')');
                }
            }
            Condition::Compare { column, op, value } => {
                buf.write_str(&dialect.quote_ident(column))
                    .write_char(' ')
                    .write_str(op)
                    .write_char(' ')
                    .write_placeholder(value.clone());
            }
            Condition::NullCheck { column, is_null } => {
                buf.write_str(&dialect.quote_ident(column)).write_str(if *is_null {
                    " IS NULL"
                } else {
                    " IS NOT NULL"
                });
            }
            Condition::In {
                column,
                values,
                negated,
            } => {
                buf.write_str(&dialect.quote_ident(column))
                    .write_str(if *negated { " NOT IN " } else { " IN " })
                    .write_placeholder(values.clone());
            }
            Condition::Between {
                column,
                from,
                to,
                negated,
            } => {
                buf.write_str(&dialect.quote_ident(column))
                    .write_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " })
                    .write_placeholder(from.clone())
                    .write_str(" AND ")
                    .write_placeholder(to.clone());
            }
            Condition::Fragment(fragment) => fragment.render(dialect, buf)?,
            Condition::True => {
                buf.write_str("1=1");
            }
            Condition::False => {
                buf.write_str("1=0");
            }
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        match self {
            Condition::And(conds) | Condition::Or(conds) => conds.iter().all(Fragment::is_empty),
            Condition::Not(inner) => inner.is_empty(),
            Condition::Fragment(fragment) => fragment.is_empty(),
            _ => false,
        }
    }
}

impl From<Expr> for Condition {
    fn from(expr: Expr) -> Self {
        Condition::fragment(expr)
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::fragment(Expr::from(sql))
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::fragment(Expr::from(sql))
    }
}

impl IntoArg for Condition {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::And(c) => f.debug_tuple("And").field(c).finish(),
            Condition::Or(c) => f.debug_tuple("Or").field(c).finish(),
            Condition::Not(c) => f.debug_tuple("Not").field(c).finish(),
            Condition::Compare { column, op, value } => f
                .debug_struct("Compare")
                .field("column", column)
                .field("op", op)
                .field("value", value)
                .finish(),
            Condition::NullCheck { column, is_null } => f
                .debug_struct("NullCheck")
                .field("column", column)
                .field("is_null", is_null)
                .finish(),
            Condition::In {
                column,
                values,
                negated,
            } => f
                .debug_struct("In")
                .field("column", column)
                .field("values", values)
                .field("negated", negated)
                .finish(),
            Condition::Between {
                column,
                from,
                to,
                negated,
            } => f
                .debug_struct("Between")
                .field("column", column)
                .field("from", from)
                .field("to", to)
                .field("negated", negated)
                .finish(),
            Condition::Fragment(_) => f.write_str("Fragment(..)"),
            Condition::True => f.write_str("True"),
            Condition::False => f.write_str("False"),
        }
    }
}
