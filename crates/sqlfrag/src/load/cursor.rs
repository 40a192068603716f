//! Result-set cursors feeding the loader.

use crate::error::{ColumnError, CursorError, DecodeError};
use crate::value::Value;

/// Receives the columns of the current row, in order.
pub trait RowSink {
    /// Whether the sink keeps column `index`.
    ///
    /// Columns it does not keep must still be delivered, but a cursor may hand
    /// them over as NULL instead of decoding the backend value.
    fn wants(&self, _index: usize) -> bool {
        true
    }

    fn column(&mut self, index: usize, value: &Value) -> Result<(), DecodeError>;
}

/// Forward-only access to a query result.
pub trait Cursor {
    /// Column names of the result, in order.
    fn columns(&self) -> Result<Vec<String>, CursorError>;

    /// Advance to the next row. Returns `false` once the result is exhausted.
    fn next_row(&mut self) -> Result<bool, CursorError>;

    /// Hand every column of the current row to `sink`, in column order.
    ///
    /// Every column must be delivered, even the ones the sink ignores.
    fn decode_row(&mut self, sink: &mut dyn RowSink) -> Result<(), ColumnError>;
}

static NULL: Value = Value::Null;

/// In-memory cursor over owned rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
}

impl RowSet {
    pub fn new<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            position: None,
        }
    }

    /// Append a row; it must have one value per column.
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn push_row(&mut self, values: Vec<Value>) {
        self.rows.push(values);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewind to before the first row.
    pub fn rewind(&mut self) {
        self.position = None;
    }
}

impl Cursor for RowSet {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        Ok(self.columns.clone())
    }

    fn next_row(&mut self) -> Result<bool, CursorError> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn decode_row(&mut self, sink: &mut dyn RowSink) -> Result<(), ColumnError> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| ColumnError {
                index: 0,
                source: DecodeError::Backend(CursorError::Closed.to_string()),
            })?;
        for index in 0..self.columns.len() {
            let value = row.get(index).unwrap_or(&NULL);
            sink.column(index, value)
                .map_err(|source| ColumnError { index, source })?;
        }
        Ok(())
    }
}
