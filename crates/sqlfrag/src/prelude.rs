//! Convenient imports for typical `sqlfrag` usage.
//!
//! ```ignore
//! use sqlfrag::prelude::*;
//! ```

pub use crate::{
    Condition, Dialect, Expr, Fragment, IntoArg, Loader, MsSql, MySql, Postgres, Sqlite, Value,
    and, between, build, delete_from, eq, expr, gt, gte, ident, in_list, insert_into, is_not_null,
    is_null, like, lt, lte, neq, not, not_in, or, raw, select, union, union_all, update,
};

pub use crate::{LoadError, LoadResult, Record, RenderError, RenderResult};
