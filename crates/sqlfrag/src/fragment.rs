//! The [`Fragment`] trait and the small fragments every statement is made of.

use crate::buffer::{Arg, Buffer, IntoArg};
use crate::config::SqlLogConfig;
use crate::dialect::Dialect;
use crate::error::RenderResult;
use crate::interpolate;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Anything that can write itself as SQL text plus bound args.
///
/// `render` writes generic `?` placeholders (see [`crate::PLACEHOLDER`]) and pushes
/// one [`Arg`] per placeholder, in order. Turning those into backend placeholders is
/// the interpolator's job, not the fragment's.
pub trait Fragment: Send + Sync {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()>;

    /// Sub-queries are parenthesised when they appear as an arg of another fragment.
    fn is_subquery(&self) -> bool {
        false
    }

    /// Empty fragments are dropped from the clause they appear in.
    fn is_empty(&self) -> bool {
        false
    }

    /// Render and interpolate into backend SQL with native placeholders.
    fn build(&self, dialect: &dyn Dialect) -> RenderResult<BuiltQuery>
    where
        Self: Sized,
    {
        interpolate::build(self, dialect)
    }

    /// Like [`Fragment::build`], logging per `config`.
    fn build_with(&self, dialect: &dyn Dialect, config: &SqlLogConfig) -> RenderResult<BuiltQuery>
    where
        Self: Sized,
    {
        interpolate::build_with(self, dialect, config)
    }

    /// Render with every value inlined as a literal. For logs and debugging only.
    fn to_debug_sql(&self, dialect: &dyn Dialect) -> RenderResult<String>
    where
        Self: Sized,
    {
        let mut buf = Buffer::new();
        self.render(dialect, &mut buf)?;
        interpolate::interpolate_literal(dialect, buf.sql(), buf.args())
    }
}

/// Shared handle to a fragment tree node.
pub type FragmentRef = Arc<dyn Fragment>;

impl<F: Fragment + ?Sized> Fragment for Arc<F> {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        (**self).render(dialect, buf)
    }

    fn is_subquery(&self) -> bool {
        (**self).is_subquery()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}

impl<F: Fragment + ?Sized> Fragment for Box<F> {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        (**self).render(dialect, buf)
    }

    fn is_subquery(&self) -> bool {
        (**self).is_subquery()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}

/// Final SQL ready for execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltQuery {
    pub sql: String,
    pub values: Vec<Value>,
}

impl BuiltQuery {
    /// Parameters as references compatible with tokio-postgres.
    #[cfg(feature = "postgres")]
    pub fn params_ref(&self) -> Vec<&(dyn tokio_postgres::types::ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| v as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect()
    }
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A fragment backed by a closure.
pub struct BuildFn<F>(pub F);

impl<F> Fragment for BuildFn<F>
where
    F: Fn(&dyn Dialect, &mut Buffer) -> RenderResult<()> + Send + Sync,
{
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        (self.0)(dialect, buf)
    }
}

impl<F> fmt::Debug for BuildFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BuildFn").field(&"<closure>").finish()
    }
}

/// Raw SQL text with `?` placeholders and the args bound to them.
///
/// Text is copied verbatim, so it is never quoted or validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    sql: String,
    args: Vec<Arg>,
}

/// Raw SQL expression; bind values with [`Expr::bind`].
///
/// ```ignore
/// expr("count > ? AND tags ?? ?").bind(10).bind("rust")
/// ```
pub fn expr(sql: impl Into<String>) -> Expr {
    Expr {
        sql: sql.into(),
        args: Vec::new(),
    }
}

/// Raw SQL without args.
pub fn raw(sql: impl Into<String>) -> Expr {
    expr(sql)
}

impl Expr {
    pub fn bind(mut self, value: impl IntoArg) -> Self {
        self.args.push(value.into_arg());
        self
    }

    pub fn bind_all<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoArg,
    {
        self.args.extend(values.into_iter().map(IntoArg::into_arg));
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }
}

impl Fragment for Expr {
    fn render(&self, _dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        buf.write_str(&self.sql).push_args(self.args.iter().cloned());
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }
}

impl From<&str> for Expr {
    fn from(sql: &str) -> Self {
        expr(sql)
    }
}

impl From<String> for Expr {
    fn from(sql: String) -> Self {
        expr(sql)
    }
}

impl IntoArg for Expr {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}

/// A quoted identifier, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    name: String,
    alias: Option<String>,
}

/// Identifier quoted by the dialect at render time (`users.id` → `"users"."id"`).
pub fn ident(name: impl Into<String>) -> Ident {
    Ident {
        name: name.into(),
        alias: None,
    }
}

impl Ident {
    pub fn as_(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Fragment for Ident {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        buf.write_str(&dialect.quote_ident(&self.name));
        if let Some(alias) = &self.alias {
            buf.write_str(" AS ").write_str(&dialect.quote_ident(alias));
        }
        Ok(())
    }
}

impl IntoArg for Ident {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}

/// `<fragment> AS <alias>`; sub-queries get parenthesised.
#[derive(Clone)]
pub struct Alias {
    inner: FragmentRef,
    alias: String,
}

impl Alias {
    pub fn new(inner: FragmentRef, alias: impl Into<String>) -> Self {
        Self {
            inner,
            alias: alias.into(),
        }
    }
}

impl Fragment for Alias {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        buf.write_placeholder(Arg::Fragment(self.inner.clone()))
            .write_str(" AS ")
            .write_str(&dialect.quote_ident(&self.alias));
        Ok(())
    }
}

impl IntoArg for Alias {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}

impl fmt::Debug for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alias").field("alias", &self.alias).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn test_expr_copies_text_and_args() {
        let e = expr("a = ? AND b ?? 'k'").bind(1);
        let mut buf = Buffer::new();
        e.render(&Postgres, &mut buf).unwrap();
        assert_eq!(buf.sql(), "a = ? AND b ?? 'k'");
        assert_eq!(buf.args(), &[Arg::Value(Value::Int(1))]);

        let built = e.build(&Postgres).unwrap();
        assert_eq!(built.sql, "a = $1 AND b ? 'k'");
        assert_eq!(built.values, vec![Value::Int(1)]);
    }

    #[test]
    fn test_ident_quotes_and_aliases() {
        let built = ident("u.name").as_("n").build(&MySql).unwrap();
        assert_eq!(built.sql, "`u`.`name` AS `n`");
        assert!(built.values.is_empty());
    }

    #[test]
    fn test_build_fn_renders_closure() {
        let f = BuildFn(|d: &dyn Dialect, buf: &mut Buffer| -> RenderResult<()> {
            buf.write_str("SELECT ")
                .write_str(&d.quote_ident("x"))
                .write_str(" WHERE y = ")
                .write_placeholder(Arg::value(2));
            Ok(())
        });
        let built = f.build(&Postgres).unwrap();
        assert_eq!(built.sql, r#"SELECT "x" WHERE y = $1"#);
        assert_eq!(built.values, vec![Value::Int(2)]);
    }

    #[test]
    fn test_debug_sql_inlines_literals() {
        let e = expr("name = ? AND active = ?").bind("o'neil").bind(true);
        assert_eq!(
            e.to_debug_sql(&Postgres).unwrap(),
            "name = 'o''neil' AND active = TRUE"
        );
    }

    #[test]
    fn test_blank_expr_is_empty() {
        assert!(raw("  ").is_empty());
        assert!(!raw("1=1").is_empty());
    }
}
