//! DELETE assembler.

use super::{Comments, render_limit, render_where};
use crate::buffer::{Arg, Buffer, IntoArg};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{RenderError, RenderResult};
use crate::fragment::{Expr, Fragment};

/// `DELETE FROM ...` statement.
#[derive(Debug, Clone, Default)]
pub struct Delete {
    raw: Option<Expr>,
    table: String,
    where_: Vec<Condition>,
    limit: Option<u64>,
    comments: Comments,
}

pub fn delete_from(table: impl Into<String>) -> Delete {
    Delete {
        table: table.into(),
        ..Delete::default()
    }
}

/// A DELETE backed by raw SQL.
pub fn delete_by_sql(sql: impl Into<Expr>) -> Delete {
    Delete {
        raw: Some(sql.into()),
        ..Delete::default()
    }
}

impl Delete {
    pub fn where_(mut self, cond: impl Into<Condition>) -> Self {
        self.where_.push(cond.into());
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comments.push(comment);
        self
    }
}

impl Fragment for Delete {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        if let Some(raw) = &self.raw {
            return raw.render(dialect, buf);
        }
        if self.table.is_empty() {
            return Err(RenderError::MissingTable);
        }

        self.comments.render(buf);
        buf.write_str("DELETE FROM ")
            .write_str(&dialect.quote_ident(&self.table));
        render_where(&self.where_, " WHERE ", dialect, buf)?;
        render_limit(self.limit, buf);
        Ok(())
    }
}

impl IntoArg for Delete {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}
