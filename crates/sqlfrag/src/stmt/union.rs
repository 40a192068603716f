//! UNION / UNION ALL.

use crate::buffer::{Arg, Buffer, IntoArg};
use crate::dialect::Dialect;
use crate::error::RenderResult;
use crate::fragment::{Alias, Fragment, FragmentRef};
use std::fmt;
use std::sync::Arc;

/// `<a> UNION [ALL] <b> ...`
#[derive(Clone)]
pub struct Union {
    parts: Vec<FragmentRef>,
    all: bool,
}

pub fn union<I, F>(parts: I) -> Union
where
    I: IntoIterator<Item = F>,
    F: Fragment + 'static,
{
    Union {
        parts: parts
            .into_iter()
            .map(|p| Arc::new(p) as FragmentRef)
            .collect(),
        all: false,
    }
}

pub fn union_all<I, F>(parts: I) -> Union
where
    I: IntoIterator<Item = F>,
    F: Fragment + 'static,
{
    Union {
        all: true,
        ..union(parts)
    }
}

impl Union {
    /// `(<union>) AS alias`
    pub fn as_(self, alias: impl Into<String>) -> Alias {
        Alias::new(Arc::new(self), alias)
    }
}

impl Fragment for Union {
    fn render(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> RenderResult<()> {
        let sep = if self.all { " UNION ALL " } else { " UNION " };
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                buf.write_str(sep);
            }
            part.render(dialect, buf)?;
        }
        Ok(())
    }

    fn is_subquery(&self) -> bool {
        true
    }

    fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl IntoArg for Union {
    fn into_arg(self) -> Arg {
        Arg::fragment(self)
    }
}

impl fmt::Debug for Union {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Union")
            .field("parts", &self.parts.len())
            .field("all", &self.all)
            .finish()
    }
}
