//! # sqlfrag
//!
//! Composable SQL statement fragments with dialect-aware interpolation, and a
//! generic loader that materializes query results into Rust values.
//!
//! ## Features
//!
//! - **Fragments all the way down**: expressions, conditions and whole statements
//!   render into a shared buffer and nest freely (sub-queries, `IN (SELECT ...)`)
//! - **One placeholder syntax**: write `?`, get `?` on MySQL/SQLite, `$n` on
//!   Postgres and `@pn` on SQL Server; `??` is a literal question mark
//! - **List expansion**: a list arg becomes `(?, ?, ?)`, an empty one `(NULL)`
//! - **Debug SQL**: the same statement with values inlined as literals
//! - **Row loading**: rows into a record, a `Vec`, or a map keyed by the first column
//!
//! ## Building statements
//!
//! ```ignore
//! use sqlfrag::prelude::*;
//!
//! let stmt = select(["id", "name"])
//!     .from("users")
//!     .where_(and(vec![eq("status", "active"), in_list("role", vec!["admin", "owner"])]))
//!     .order_desc("created_at")
//!     .limit(10);
//!
//! let query = build(&stmt, &Postgres)?;
//! // SELECT id, name FROM users WHERE ("status" = $1) AND ("role" IN ($2, $3))
//! //   ORDER BY created_at DESC LIMIT 10
//! ```
//!
//! ## Loading rows
//!
//! ```ignore
//! #[derive(Debug, Default, Record)]
//! struct User {
//!     id: i64,
//!     #[sql(column = "user_name")]
//!     name: String,
//! }
//!
//! let loader = Loader::new();
//! let mut users: Vec<User> = Vec::new();
//! loader.load(&mut cursor, &mut users)?;
//!
//! let mut by_id: HashMap<i64, User> = HashMap::new();
//! loader.load(&mut cursor, &mut by_id)?;
//! ```

extern crate self as sqlfrag;

pub mod buffer;
pub mod condition;
pub mod config;
pub mod dialect;
pub mod error;
pub mod fragment;
pub mod interpolate;
pub mod load;
pub mod naming;
pub mod prelude;
pub mod stmt;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use buffer::{Arg, Buffer, ESCAPED_PLACEHOLDER, IntoArg, PLACEHOLDER};
pub use condition::{
    Condition, and, between, eq, gt, gte, in_list, is_not_null, is_null, like, lt, lte, neq, not,
    not_between, not_in, not_like, or,
};
pub use config::{Settings, SqlLogConfig};
pub use dialect::{Dialect, DialectKind, MsSql, MySql, Postgres, Sqlite};
pub use error::{
    ColumnError, CursorError, DecodeError, Error, LoadError, LoadResult, RenderError, RenderResult,
};
pub use fragment::{Alias, BuildFn, BuiltQuery, Expr, Fragment, FragmentRef, Ident, expr, ident, raw};
pub use interpolate::{build, build_with, count_placeholders, interpolate, interpolate_literal};
pub use load::{
    Cursor, Decode, Destination, DestinationShape, Element, Encode, Json, Loader, Record, RowSet,
    TagCache, load,
};
pub use naming::to_snake_case;
pub use stmt::{
    Delete, Direction, Insert, Join, JoinKind, Select, Union, Update, delete_by_sql, delete_from,
    insert_by_sql, insert_into, select, select_by_sql, union, union_all, update, update_by_sql,
};
pub use value::Value;

#[cfg(feature = "derive")]
pub use sqlfrag_derive::Record;
