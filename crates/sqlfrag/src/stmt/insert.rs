//! INSERT assembler.

use super::{Comments, render_idents, render_output, render_returning};
use crate::buffer::{Arg, Buffer, IntoArg};
use crate::dialect::Dialect;
use crate::error::{RenderError, RenderResult};
use crate::fragment::{Expr, Fragment};
use crate::load::{Record, TagCache};

/// `INSERT INTO ...` statement.
#[derive(Debug, Clone, Default)]
pub struct Insert {
    raw: Option<Expr>,
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Arg>>,
    ignore: bool,
    returning: Vec<String>,
    comments: Comments,
    build_error: Option<RenderError>,
}

pub fn insert_into(table: impl Into<String>) -> Insert {
    Insert {
        table: table.into(),
        ..Insert::default()
    }
}

/// An INSERT backed by raw SQL.
pub fn insert_by_sql(sql: impl Into<Expr>) -> Insert {
    Insert {
        raw: Some(sql.into()),
        ..Insert::default()
    }
}

impl Insert {
    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add one row; its values must follow the column order.
    pub fn values<I>(mut self, row: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        self.rows.push(row.into_iter().map(IntoArg::into_arg).collect());
        self
    }

    /// Add one row read from the fields of `record`, matched to the columns the
    /// same way loaded columns are matched to fields.
    ///
    /// With no columns set, the record's own column names are used.
    pub fn record<R: Record>(self, record: &R) -> Self {
        self.record_with(&TagCache::new(), record)
    }

    /// [`Insert::record`] with a shared tag cache.
    pub fn record_with<R: Record>(mut self, tags: &TagCache, record: &R) -> Self {
        if self.columns.is_empty() {
            self.columns = tags.column_names::<R>();
        }
        match tags.values_of(record, &self.columns) {
            Ok(values) => self.rows.push(values.into_iter().map(Arg::Value).collect()),
            Err(err) => {
                self.build_error.get_or_insert(err);
            }
        }
        self
    }

    /// Add a `(column, value)` pair to a single-row insert.
    pub fn pair(mut self, column: impl Into<String>, value: impl IntoArg) -> Self {
        self.columns.push(column.into());
        match self.rows.len() {
            0 => self.rows.push(vec![value.into_arg()]),
            1 => self.rows[0].push(value.into_arg()),
            _ => {
                self.build_error = Some(RenderError::fragment(
                    "pair only allows one row to insert",
                ))
            }
        }
        self
    }

    /// `INSERT IGNORE` (MySQL).
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Columns returned by the insert (`RETURNING`, or `OUTPUT INSERTED.*` on SQL Server).
    pub fn returning<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.returning = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comments.push(comment);
        self
    }
}

impl Fragment for Insert {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        if let Some(raw) = &self.raw {
            return raw.render(dialect, buf);
        }
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        if self.table.is_empty() {
            return Err(RenderError::MissingTable);
        }
        if self.columns.is_empty() {
            return Err(RenderError::MissingColumns);
        }
        if self.rows.is_empty() {
            return Err(RenderError::MissingValues);
        }

        self.comments.render(buf);
        buf.write_str(if self.ignore {
            "INSERT IGNORE INTO "
        } else {
            "INSERT INTO "
        });
        buf.write_str(&dialect.quote_ident(&self.table)).write_str(" (");
        render_idents(&self.columns, dialect, buf);
        buf.write_char(')');

        render_output(&self.returning, dialect, buf);

        buf.write_str(" VALUES ");
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(RenderError::ValueCount {
                    columns: self.columns.len(),
                    values: row.len(),
                });
            }
            if i > 0 {
                buf.write_str(", ");
            }
            buf.write_char('(');
            for (j, arg) in row.iter().enumerate() {
                if j > 0 {
                    buf.write_str(", ");
                }
                buf.write_placeholder(arg.clone());
            }
            buf.write_char(')');
        }

        render_returning(&self.returning, dialect, buf);
        Ok(())
    }
}

impl IntoArg for Insert {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}
