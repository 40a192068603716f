//! UPDATE assembler.

use super::{Comments, render_limit, render_output, render_returning, render_where};
use crate::buffer::{Arg, Buffer, IntoArg};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{RenderError, RenderResult};
use crate::fragment::{Expr, Fragment, expr, ident};

/// `UPDATE ... SET ...` statement.
#[derive(Debug, Clone, Default)]
pub struct Update {
    raw: Option<Expr>,
    table: String,
    sets: Vec<(String, Arg)>,
    where_: Vec<Condition>,
    returning: Vec<String>,
    limit: Option<u64>,
    comments: Comments,
}

pub fn update(table: impl Into<String>) -> Update {
    Update {
        table: table.into(),
        ..Update::default()
    }
}

/// An UPDATE backed by raw SQL.
pub fn update_by_sql(sql: impl Into<Expr>) -> Update {
    Update {
        raw: Some(sql.into()),
        ..Update::default()
    }
}

impl Update {
    /// `column = value`. Setting the same column again replaces the earlier value
    /// in place.
    pub fn set(mut self, column: impl Into<String>, value: impl IntoArg) -> Self {
        let column = column.into();
        let value = value.into_arg();
        match self.sets.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.sets.push((column, value)),
        }
        self
    }

    pub fn set_map<I, C, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: IntoArg,
    {
        pairs
            .into_iter()
            .fold(self, |stmt, (column, value)| stmt.set(column, value))
    }

    /// `column = column + value`
    pub fn incr_by(self, column: impl Into<String>, value: impl IntoArg) -> Self {
        let column = column.into();
        let delta = expr("? + ?").bind(ident(column.clone())).bind(value);
        self.set(column, delta)
    }

    /// `column = column - value`
    pub fn decr_by(self, column: impl Into<String>, value: impl IntoArg) -> Self {
        let column = column.into();
        let delta = expr("? - ?").bind(ident(column.clone())).bind(value);
        self.set(column, delta)
    }

    pub fn where_(mut self, cond: impl Into<Condition>) -> Self {
        self.where_.push(cond.into());
        self
    }

    pub fn returning<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.returning = columns.into_iter().map(Into::into).collect();
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

impl Fragment for Update {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        if let Some(raw) = &self.raw {
            return raw.render(dialect, buf);
        }
        if self.table.is_empty() {
            return Err(RenderError::MissingTable);
        }
        if self.sets.is_empty() {
            return Err(RenderError::MissingColumns);
        }

        self.comments.render(buf);
        buf.write_str("UPDATE ")
            .write_str(&dialect.quote_ident(&self.table))
            .write_str(" SET ");
        for (i, (column, value)) in self.sets.iter().enumerate() {
            if i > 0 {
                buf.write_str(", ");
            }
            buf.write_str(&dialect.quote_ident(column))
                .write_str(" = ")
                .write_placeholder(value.clone());
        }

        render_output(&self.returning, dialect, buf);
        render_where(&self.where_, " WHERE ", dialect, buf)?;
        render_returning(&self.returning, dialect, buf);
        render_limit(self.limit, buf);
        Ok(())
    }
}

impl IntoArg for Update {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}
