//! SELECT assembler.

use super::{Comments, Source, render_where};
use crate::buffer::{Arg, Buffer, IntoArg};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{RenderError, RenderResult};
use crate::fragment::{Alias, Expr, Fragment, expr};
use std::sync::Arc;

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
struct Order {
    column: String,
    dir: Option<Direction>,
}

impl Order {
    fn render(&self, buf: &mut Buffer) {
        buf.write_str(&self.column);
        match self.dir {
            Some(Direction::Asc) => buf.write_str(" ASC"),
            Some(Direction::Desc) => buf.write_str(" DESC"),
            None => buf,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => " JOIN ",
            JoinKind::Left => " LEFT JOIN ",
            JoinKind::Right => " RIGHT JOIN ",
            JoinKind::Full => " FULL JOIN ",
        }
    }
}

/// One JOIN clause. Table names are quoted; fragments are nested as-is.
#[derive(Debug, Clone)]
pub struct Join {
    kind: JoinKind,
    table: Source,
    on: Condition,
}

impl Join {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        buf.write_str(self.kind.keyword());
        self.table.render_quoted(dialect, buf);
        buf.write_str(" ON ");
        self.on.render(dialect, buf)
    }
}

/// `SELECT ...` statement.
#[derive(Debug, Clone, Default)]
pub struct Select {
    raw: Option<Expr>,
    distinct: bool,
    columns: Vec<Source>,
    table: Option<Source>,
    joins: Vec<Join>,
    where_: Vec<Condition>,
    group_by: Vec<String>,
    having: Vec<Condition>,
    order: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
    suffixes: Vec<Expr>,
    comments: Comments,
}

/// Start a SELECT with the given columns. Column names are written as-is, so they
/// may be expressions such as `count(*)`.
pub fn select<I, C>(columns: I) -> Select
where
    I: IntoIterator<Item = C>,
    C: Into<Source>,
{
    Select {
        columns: columns.into_iter().map(Into::into).collect(),
        ..Select::default()
    }
}

/// A SELECT backed by raw SQL. The other clauses are ignored.
pub fn select_by_sql(sql: impl Into<Expr>) -> Select {
    Select {
        raw: Some(sql.into()),
        ..Select::default()
    }
}

impl Select {
    /// Append one column.
    pub fn column(mut self, column: impl Into<Source>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Table name (written as-is) or a sub-query / aliased fragment.
    pub fn from(mut self, table: impl Into<Source>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a WHERE condition; multiple conditions are ANDed.
    pub fn where_(mut self, cond: impl Into<Condition>) -> Self {
        self.where_.push(cond.into());
        self
    }

    /// Add a HAVING condition; multiple conditions are ANDed.
    pub fn having(mut self, cond: impl Into<Condition>) -> Self {
        self.having.push(cond.into());
        self
    }

    pub fn group_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_asc(self, column: impl Into<String>) -> Self {
        self.order_dir(column, Direction::Asc)
    }

    pub fn order_desc(self, column: impl Into<String>) -> Self {
        self.order_dir(column, Direction::Desc)
    }

    /// ORDER BY a raw expression, with no explicit direction.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            dir: None,
        });
        self
    }

    pub fn order_dir(mut self, column: impl Into<String>, dir: Direction) -> Self {
        self.order.push(Order {
            column: column.into(),
            dir: Some(dir),
        });
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Page-number pagination; pages start at 1.
    pub fn paginate(self, page: u64, per_page: u64) -> Self {
        self.limit(per_page)
            .offset(page.saturating_sub(1).saturating_mul(per_page))
    }

    /// Keyset pagination: rows with `cursor < column <= cursor + limit`.
    ///
    /// A zero `limit` falls back to 10.
    pub fn seek(self, column: &str, cursor: i64, limit: u64) -> Self {
        let limit = if limit == 0 { 10 } else { limit };
        let next = cursor.saturating_add(i64::try_from(limit).unwrap_or(i64::MAX));
        self.limit(limit).where_(
            expr(format!("{column} > ? AND {column} <= ?"))
                .bind(cursor)
                .bind(next),
        )
    }

    /// Raw text appended after every other clause (e.g. `FOR UPDATE`).
    pub fn suffix(mut self, suffix: impl Into<Expr>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comments.push(comment);
        self
    }

    pub fn join(self, table: impl Into<Source>, on: impl Into<Condition>) -> Self {
        self.join_kind(JoinKind::Inner, table, on)
    }

    pub fn left_join(self, table: impl Into<Source>, on: impl Into<Condition>) -> Self {
        self.join_kind(JoinKind::Left, table, on)
    }

    pub fn right_join(self, table: impl Into<Source>, on: impl Into<Condition>) -> Self {
        self.join_kind(JoinKind::Right, table, on)
    }

    pub fn full_join(self, table: impl Into<Source>, on: impl Into<Condition>) -> Self {
        self.join_kind(JoinKind::Full, table, on)
    }

    fn join_kind(mut self, kind: JoinKind, table: impl Into<Source>, on: impl Into<Condition>) -> Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    /// `(<select>) AS alias`
    pub fn as_(self, alias: impl Into<String>) -> Alias {
        Alias::new(Arc::new(self), alias)
    }

    fn render_pagination(&self, dialect: &dyn Dialect, buf: &mut Buffer) {
        if !dialect.requires_order_for_offset() {
            if let Some(n) = self.limit {
                buf.write_str(" LIMIT ").write_str(&n.to_string());
            }
            if let Some(n) = self.offset {
                buf.write_str(" OFFSET ").write_str(&n.to_string());
            }
            return;
        }

        if self.limit.is_none() && self.offset.is_none() {
            return;
        }
        if self.order.is_empty() {
            // OFFSET ... FETCH needs an ORDER BY
            buf.write_str(" ORDER BY ");
            if let Some(first) = self.columns.first() {
                first.render_raw(buf);
            }
        }
        buf.write_str(" OFFSET ")
            .write_str(&self.offset.unwrap_or(0).to_string())
            .write_str(" ROWS");
        if let Some(n) = self.limit {
            buf.write_str(" FETCH NEXT ")
                .write_str(&n.to_string())
                .write_str(" ROWS ONLY");
        }
    }
}

impl Fragment for Select {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        if let Some(raw) = &self.raw {
            return raw.render(dialect, buf);
        }
        if self.columns.is_empty() {
            return Err(RenderError::MissingColumns);
        }

        self.comments.render(buf);
        buf.write_str("SELECT ");
        if self.distinct {
            buf.write_str("DISTINCT ");
        }
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                buf.write_str(", ");
            }
            col.render_raw(buf);
        }

        if let Some(table) = &self.table {
            buf.write_str(" FROM ");
            table.render_raw(buf);
            for join in &self.joins {
                join.render(dialect, buf)?;
            }
        }

        render_where(&self.where_, " WHERE ", dialect, buf)?;

        if !self.group_by.is_empty() {
            buf.write_str(" GROUP BY ").write_str(&self.group_by.join(", "));
        }

        render_where(&self.having, " HAVING ", dialect, buf)?;

        if !self.order.is_empty() {
            buf.write_str(" ORDER BY ");
            for (i, order) in self.order.iter().enumerate() {
                if i > 0 {
                    buf.write_str(", ");
                }
                order.render(buf);
            }
        }

        self.render_pagination(dialect, buf);

        for suffix in &self.suffixes {
            buf.write_char(' ');
            suffix.render(dialect, buf)?;
        }
        Ok(())
    }

    fn is_subquery(&self) -> bool {
        true
    }
}

impl IntoArg for Select {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}
