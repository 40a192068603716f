//! Error types for sqlfrag

use thiserror::Error;

/// Result type alias for rendering and interpolation.
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type alias for row loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised while rendering a fragment tree or interpolating its placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// INSERT/UPDATE/DELETE rendered without a table
    #[error("table not specified")]
    MissingTable,

    /// A required column list (or SET list) is empty
    #[error("column not specified")]
    MissingColumns,

    /// INSERT rendered without any value tuple
    #[error("values not specified")]
    MissingValues,

    /// Placeholders in the rendered text do not match the bound args
    #[error("wrong placeholder count: {found} placeholders for {expected} values")]
    PlaceholderCount { expected: usize, found: usize },

    /// An INSERT value tuple does not match the column list
    #[error("wrong value count: {values} values for {columns} columns")]
    ValueCount { columns: usize, values: usize },

    /// Error reported by a caller-supplied fragment
    #[error("{0}")]
    Fragment(String),
}

impl RenderError {
    /// Create an error from a custom fragment.
    pub fn fragment(message: impl Into<String>) -> Self {
        Self::Fragment(message.into())
    }
}

/// Errors raised while decoding a single column value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// NULL decoded into a non-nullable destination
    #[error("unexpected NULL")]
    UnexpectedNull,

    /// The column value has a different kind than the destination
    #[error("cannot decode {found} as {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Numeric value does not fit the destination type
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),

    /// The value is of the right kind but malformed
    #[error("invalid value: {0}")]
    Invalid(String),

    /// The cursor could not produce the column value
    #[error("backend error: {0}")]
    Backend(String),
}

impl DecodeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Errors reported by a result-set cursor.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The cursor has no current row or was already exhausted
    #[error("cursor is closed")]
    Closed,

    /// tokio-postgres failure
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Other backend failures
    #[error("{0}")]
    Other(String),
}

/// A decode failure on one column of the current row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column #{index}: {source}")]
pub struct ColumnError {
    pub index: usize,
    #[source]
    pub source: DecodeError,
}

/// Errors raised by the row loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The cursor could not report its column names
    #[error("column introspection failed: {0}")]
    ColumnIntrospectionFailed(#[source] CursorError),

    /// The destination cannot receive this result
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// Decoding a column of the current row failed
    #[error("scan failed on column '{column}': {source}")]
    ScanFailed {
        column: String,
        #[source]
        source: DecodeError,
    },

    /// Advancing the cursor failed
    #[error("fetch failed: {0}")]
    Fetch(#[source] CursorError),
}

impl LoadError {
    /// Check if this is a scan failure
    pub fn is_scan_failure(&self) -> bool {
        matches!(self, Self::ScanFailed { .. })
    }
}

/// Umbrella error for the execution helpers that render, run and load in one call.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("query error: {0}")]
    Query(#[from] tokio_postgres::Error),
}
