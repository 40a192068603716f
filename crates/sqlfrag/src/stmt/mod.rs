//! Statement assemblers: SELECT, INSERT, UPDATE, DELETE and UNION.
//!
//! Every assembler is a consuming builder and a [`Fragment`]. Build it with
//! [`Fragment::build`], or pass it as an arg to another fragment to nest it.

mod delete;
mod insert;
mod select;
mod union;
mod update;

pub use delete::{Delete, delete_by_sql, delete_from};
pub use insert::{Insert, insert_by_sql, insert_into};
pub use select::{Direction, Join, JoinKind, Select, select, select_by_sql};
pub use union::{Union, union, union_all};
pub use update::{Update, update, update_by_sql};

use crate::buffer::{Arg, Buffer};
use crate::condition::{Condition, render_joined};
use crate::dialect::Dialect;
use crate::error::RenderResult;
use crate::fragment::{Alias, Expr, Fragment, FragmentRef, Ident};
use std::fmt;
use std::sync::Arc;

/// A column or table reference: a name written as-is, or a nested fragment.
#[derive(Clone)]
pub enum Source {
    Name(String),
    Fragment(FragmentRef),
}

impl Source {
    /// Write a name verbatim, or a nested fragment as a placeholder.
    fn render_raw(&self, buf: &mut Buffer) {
        match self {
            Source::Name(name) => {
                buf.write_str(name);
            }
            Source::Fragment(f) => {
                buf.write_placeholder(Arg::Fragment(f.clone()));
            }
        }
    }

    /// Like [`Source::render_raw`] but names are quoted.
    fn render_quoted(&self, dialect: &dyn Dialect, buf: &mut Buffer) {
        match self {
            Source::Name(name) => {
                buf.write_str(&dialect.quote_ident(name));
            }
            Source::Fragment(_) => self.render_raw(buf),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Source::Fragment(_) => f.write_str("Fragment(..)"),
        }
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Source::Name(name.to_string())
    }
}

impl From<String> for Source {
    fn from(name: String) -> Self {
        Source::Name(name)
    }
}

impl From<&String> for Source {
    fn from(name: &String) -> Self {
        Source::Name(name.clone())
    }
}

macro_rules! source_from_fragment {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Source {
                fn from(f: $ty) -> Self {
                    Source::Fragment(Arc::new(f))
                }
            }
        )*
    };
}

source_from_fragment!(Select, Union, Alias, Ident, Expr);

impl From<FragmentRef> for Source {
    fn from(f: FragmentRef) -> Self {
        Source::Fragment(f)
    }
}

/// SQL comments prepended to a statement, one `/* ... */` line each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments(Vec<String>);

impl Comments {
    /// Append a comment; `/*` and `*/` are stripped from the text.
    pub fn push(&mut self, comment: &str) {
        let text = comment.replace("/*", "").replace("*/", "");
        self.0.push(text.trim().to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn render(&self, buf: &mut Buffer) {
        for comment in &self.0 {
            buf.write_str("/* ").write_str(comment).write_str(" */\n");
        }
    }
}

fn render_where(conds: &[Condition], keyword: &str, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
    if conds.iter().all(Fragment::is_empty) {
        return Ok(());
    }
    buf.write_str(keyword);
    render_joined(conds, " AND ", dialect, buf)
}

fn render_idents(columns: &[String], dialect: &dyn Dialect, buf: &mut Buffer) {
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            buf.write_str(", ");
        }
        buf.write_str(&dialect.quote_ident(col));
    }
}

fn render_returning(columns: &[String], dialect: &dyn Dialect, buf: &mut Buffer) {
    if columns.is_empty() || dialect.uses_output_clause() {
        return;
    }
    buf.write_str(" RETURNING ");
    render_idents(columns, dialect, buf);
}

fn render_output(columns: &[String], dialect: &dyn Dialect, buf: &mut Buffer) {
    if columns.is_empty() || !dialect.uses_output_clause() {
        return;
    }
    buf.write_str(" OUTPUT ");
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            buf.write_str(", ");
        }
        buf.write_str("INSERTED.").write_str(&dialect.quote_ident(col));
    }
}

fn render_limit(limit: Option<u64>, buf: &mut Buffer) {
    if let Some(n) = limit {
        buf.write_str(" LIMIT ").write_str(&n.to_string());
    }
}
