//! tokio-postgres adapter: bind [`Value`]s as parameters, read results through
//! the [`Cursor`] contract and load them with a [`Loader`].
//!
//! ```ignore
//! use sqlfrag::postgres::load_fragment;
//! use sqlfrag::{Loader, expr, select};
//!
//! let stmt = select(["id", "name"]).from("users").where_(expr("id > ?").bind(10));
//! let mut users: Vec<User> = Vec::new();
//! load_fragment(&client, &Loader::new(), &stmt, &mut users).await?;
//! ```

use crate::dialect::Postgres;
use crate::error::{ColumnError, CursorError, DecodeError, Error};
use crate::fragment::{BuiltQuery, Fragment};
use crate::interpolate::build;
use crate::load::{Cursor, Destination, Loader, RowSink};
use crate::value::Value;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error as StdError;
use std::future::Future;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};
use tokio_postgres::{Row, Statement};
use uuid::Uuid;

type BoxError = Box<dyn StdError + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql_checked(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql_checked(ty, out)
                }
                Type::UUID => Uuid::parse_str(s)?.to_sql_checked(ty, out),
                _ => s.to_sql_checked(ty, out),
            },
            Value::Bytes(b) => (&b[..]).to_sql_checked(ty, out),
            Value::Json(j) => j.to_sql_checked(ty, out),
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMP => t.naive_utc().to_sql_checked(ty, out),
                Type::DATE => t.date_naive().to_sql_checked(ty, out),
                _ => t.to_sql_checked(ty, out),
            },
            Value::Uuid(u) => match *ty {
                Type::TEXT | Type::VARCHAR => u.to_string().to_sql_checked(ty, out),
                _ => u.to_sql_checked(ty, out),
            },
        }
    }

    // Every variant checks its own target type in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Integers bind to any integer or float column; narrowing is range checked.
fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql_checked(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql_checked(ty, out),
        Type::OID => u32::try_from(i)?.to_sql_checked(ty, out),
        Type::FLOAT4 => (i as f32).to_sql_checked(ty, out),
        Type::FLOAT8 => (i as f64).to_sql_checked(ty, out),
        Type::BOOL => (i != 0).to_sql_checked(ty, out),
        _ => i.to_sql_checked(ty, out),
    }
}

fn get<'a, T>(row: &'a Row, index: usize) -> Result<Option<T>, DecodeError>
where
    T: FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index)
        .map_err(|e| DecodeError::Backend(e.to_string()))
}

/// Decode column `index` of `row` by its Postgres type.
pub fn column_value(row: &Row, index: usize) -> Result<Value, DecodeError> {
    let ty = row
        .columns()
        .get(index)
        .map(|c| c.type_().clone())
        .ok_or_else(|| DecodeError::Backend(format!("no column #{index}")))?;

    let value = match ty {
        Type::BOOL => get::<bool>(row, index)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, index)?.map(Value::from),
        Type::INT4 => get::<i32>(row, index)?.map(Value::from),
        Type::INT8 => get::<i64>(row, index)?.map(Value::Int),
        Type::OID => get::<u32>(row, index)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, index)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, index)?.map(Value::Float),
        Type::BYTEA => get::<Vec<u8>>(row, index)?.map(|b| Value::Bytes(Bytes::from(b))),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, index)?.map(Value::Json),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, index)?.map(Value::Timestamp),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, index)?.map(Value::from),
        Type::DATE => get::<NaiveDate>(row, index)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Value::from),
        Type::UUID => get::<Uuid>(row, index)?.map(Value::Uuid),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, index)?.map(Value::Text)
        }
        other => {
            return Err(DecodeError::invalid(format!(
                "unsupported column type {other}"
            )));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// [`Cursor`] over the rows of one executed statement.
///
/// Column names come from the statement, so they are known even when no row
/// came back.
#[derive(Debug)]
pub struct PgRows {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
}

impl PgRows {
    pub fn new(statement: &Statement, rows: Vec<Row>) -> Self {
        Self {
            columns: statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            rows: rows.into_iter(),
            current: None,
        }
    }
}

impl Cursor for PgRows {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        Ok(self.columns.clone())
    }

    fn next_row(&mut self) -> Result<bool, CursorError> {
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn decode_row(&mut self, sink: &mut dyn RowSink) -> Result<(), ColumnError> {
        let row = self.current.as_ref().ok_or_else(|| ColumnError {
            index: 0,
            source: DecodeError::Backend(CursorError::Closed.to_string()),
        })?;
        for index in 0..self.columns.len() {
            deliver(sink, index, || column_value(row, index))?;
        }
        Ok(())
    }
}

/// Hand column `index` to `sink`. Columns the sink discards are passed as NULL
/// without being read, so types [`column_value`] cannot decode only fail where a
/// field wants them.
fn deliver(
    sink: &mut dyn RowSink,
    index: usize,
    read: impl FnOnce() -> Result<Value, DecodeError>,
) -> Result<(), ColumnError> {
    let value = if sink.wants(index) {
        read().map_err(|source| ColumnError { index, source })?
    } else {
        Value::Null
    };
    sink.column(index, &value)
        .map_err(|source| ColumnError { index, source })
}

/// A client or transaction that can prepare and run statements.
pub trait GenericClient: Send + Sync {
    fn prepare(
        &self,
        sql: &str,
    ) -> impl Future<Output = Result<Statement, tokio_postgres::Error>> + Send;

    fn query_prepared(
        &self,
        statement: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Row>, tokio_postgres::Error>> + Send;

    fn execute_prepared(
        &self,
        statement: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, tokio_postgres::Error>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn prepare(&self, sql: &str) -> Result<Statement, tokio_postgres::Error> {
        tokio_postgres::Client::prepare(self, sql).await
    }

    async fn query_prepared(
        &self,
        statement: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, tokio_postgres::Error> {
        tokio_postgres::Client::query(self, statement, params).await
    }

    async fn execute_prepared(
        &self,
        statement: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, tokio_postgres::Error> {
        tokio_postgres::Client::execute(self, statement, params).await
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn prepare(&self, sql: &str) -> Result<Statement, tokio_postgres::Error> {
        tokio_postgres::Transaction::prepare(self, sql).await
    }

    async fn query_prepared(
        &self,
        statement: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, tokio_postgres::Error> {
        tokio_postgres::Transaction::query(self, statement, params).await
    }

    async fn execute_prepared(
        &self,
        statement: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, tokio_postgres::Error> {
        tokio_postgres::Transaction::execute(self, statement, params).await
    }
}

/// Run a built query and collect its rows into a cursor.
pub async fn fetch<C>(client: &C, query: &BuiltQuery) -> Result<PgRows, tokio_postgres::Error>
where
    C: GenericClient + ?Sized,
{
    let statement = client.prepare(&query.sql).await?;
    let rows = client.query_prepared(&statement, &query.params_ref()).await?;
    Ok(PgRows::new(&statement, rows))
}

/// Run a built statement that returns no rows; returns the affected row count.
pub async fn execute<C>(client: &C, query: &BuiltQuery) -> Result<u64, tokio_postgres::Error>
where
    C: GenericClient + ?Sized,
{
    let statement = client.prepare(&query.sql).await?;
    client.execute_prepared(&statement, &query.params_ref()).await
}

/// Run `query` and load its rows into `dest`.
pub async fn load_query<C, D>(
    client: &C,
    loader: &Loader,
    query: &BuiltQuery,
    dest: &mut D,
) -> Result<usize, Error>
where
    C: GenericClient + ?Sized,
    D: Destination + ?Sized,
{
    let mut rows = fetch(client, query).await?;
    Ok(loader.load(&mut rows, dest)?)
}

/// Build `fragment` for Postgres, run it and load its rows into `dest`.
pub async fn load_fragment<C, D>(
    client: &C,
    loader: &Loader,
    fragment: &dyn Fragment,
    dest: &mut D,
) -> Result<usize, Error>
where
    C: GenericClient + ?Sized,
    D: Destination + ?Sized,
{
    let query = build(fragment, &Postgres)?;
    load_query(client, loader, &query, dest).await
}
