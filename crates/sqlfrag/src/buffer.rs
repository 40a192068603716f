//! Render buffer: SQL text plus the ordered list of bound args.

use crate::fragment::{Fragment, FragmentRef};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// The generic placeholder written by fragments and rewritten by the interpolator.
///
/// Raw SQL that needs a literal `?` (e.g. the PostgreSQL JSONB `?` operator) must
/// write it doubled: `??` renders as a single `?` and consumes no value.
pub const PLACEHOLDER: &str = "?";

/// Escaped form of [`PLACEHOLDER`].
pub const ESCAPED_PLACEHOLDER: &str = "??";

/// One entry of the deferred value list.
#[derive(Clone)]
pub enum Arg {
    /// A scalar bound as one native placeholder.
    Value(Value),
    /// A list bound as `(p1, p2, ...)`.
    List(Vec<Value>),
    /// A nested fragment expanded inline at interpolation time.
    Fragment(FragmentRef),
}

impl Arg {
    pub fn value(value: impl Into<Value>) -> Self {
        Arg::Value(value.into())
    }

    pub fn list<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Arg::List(values.into_iter().map(Into::into).collect())
    }

    pub fn fragment(fragment: impl Fragment + 'static) -> Self {
        Arg::Fragment(Arc::new(fragment))
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::List(vs) => f.debug_tuple("List").field(vs).finish(),
            Arg::Fragment(_) => f.debug_tuple("Fragment").field(&"<dyn Fragment>").finish(),
        }
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Value(a), Arg::Value(b)) => a == b,
            (Arg::List(a), Arg::List(b)) => a == b,
            (Arg::Fragment(a), Arg::Fragment(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Convert an input into an [`Arg`].
///
/// Implemented for everything convertible into a [`Value`], for `Vec<T>` (bound as
/// a list), and for the statement and expression fragments of this crate.
pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl<T: Into<Value>> IntoArg for T {
    fn into_arg(self) -> Arg {
        Arg::Value(self.into())
    }
}

impl<T: Into<Value>> IntoArg for Vec<T> {
    fn into_arg(self) -> Arg {
        Arg::list(self)
    }
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for FragmentRef {
    fn into_arg(self) -> Arg {
        Arg::Fragment(self)
    }
}

/// Accumulates rendered SQL text and the args bound to its placeholders.
///
/// A buffer belongs to a single render pass; call [`Buffer::reset`] before reuse.
#[derive(Debug, Default, Clone)]
pub struct Buffer {
    sql: String,
    args: Vec<Arg>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sql: String::with_capacity(capacity),
            args: Vec::new(),
        }
    }

    /// Append raw SQL text.
    pub fn write_str(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn write_char(&mut self, ch: char) -> &mut Self {
        self.sql.push(ch);
        self
    }

    /// Append a generic placeholder and bind `arg` to it.
    pub fn write_placeholder(&mut self, arg: Arg) -> &mut Self {
        self.sql.push_str(PLACEHOLDER);
        self.args.push(arg);
        self
    }

    /// Append args without writing placeholders (the text already holds them).
    pub fn push_args(&mut self, args: impl IntoIterator<Item = Arg>) -> &mut Self {
        self.args.extend(args);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.args.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<Arg>) {
        (self.sql, self.args)
    }

    /// Clear text and args, keeping allocations.
    pub fn reset(&mut self) {
        self.sql.clear();
        self.args.clear();
    }
}
