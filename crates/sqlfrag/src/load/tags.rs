//! Record column metadata and the tag cache built from it.
//!
//! A record type describes its fields once, statically, through [`Shape`]. The
//! [`TagCache`] turns a shape into the column name of every field (explicit tag or
//! the default name mapping) and memoizes the result per type.

use super::decode::{Encode, Scan};
use crate::error::RenderResult;
use crate::naming::to_snake_case;
use crate::value::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Static description of a record type.
#[derive(Debug)]
pub struct Shape {
    pub type_name: &'static str,
    pub type_id: fn() -> TypeId,
    pub fields: &'static [FieldSpec],
}

/// One field of a record, in declaration order.
#[derive(Debug)]
pub struct FieldSpec {
    /// Rust field name.
    pub name: &'static str,
    /// Explicit column tag, if any.
    pub column: Option<&'static str>,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Decoded directly from one column.
    Leaf,
    /// Never mapped to a column.
    Skip,
    /// An embedded record whose fields are searched as if they were the parent's.
    Flatten(fn() -> &'static Shape),
}

/// Mutable access to one field, for the loader.
pub enum FieldMut<'a> {
    Leaf(&'a mut dyn Scan),
    Nested(&'a mut dyn Fields),
}

/// Shared access to one field, for encoding a record as parameters.
pub enum FieldRef<'a> {
    Leaf(&'a dyn Encode),
    Nested(&'a dyn Fields),
}

/// Index-based field access. Indices follow [`Shape::fields`].
pub trait Fields {
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;

    fn field_ref(&self, index: usize) -> Option<FieldRef<'_>>;
}

/// A struct whose fields map to result columns.
///
/// Usually derived with `#[derive(Record)]`.
pub trait Record: Fields + Default + 'static {
    fn shape() -> &'static Shape;
}

/// Per-type column names: one entry per field, `None` for fields that are
/// skipped or flattened.
pub type Tags = Arc<[Option<String>]>;

/// Memoized field-to-column mapping, keyed by record type.
///
/// Entries are built on first use and never invalidated. Concurrent first access
/// is safe: the tag list is computed outside the lock and the first writer wins,
/// so readers only ever see complete lists.
pub struct TagCache {
    entries: RwLock<HashMap<TypeId, Tags>>,
    name_mapping: fn(&str) -> String,
}

impl Default for TagCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TagCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("TagCache").field("entries", &len).finish()
    }
}

impl TagCache {
    /// A cache using [`to_snake_case`] for untagged fields.
    pub fn new() -> Self {
        Self::with_name_mapping(to_snake_case)
    }

    /// A cache using `mapping` for untagged fields.
    pub fn with_name_mapping(mapping: fn(&str) -> String) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            name_mapping: mapping,
        }
    }

    /// Column tags for `shape`.
    pub fn tags(&self, shape: &'static Shape) -> Tags {
        let key = (shape.type_id)();
        if let Some(tags) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return tags.clone();
        }

        let computed: Tags = shape
            .fields
            .iter()
            .map(|field| match field.kind {
                FieldKind::Leaf => Some(match field.column {
                    Some(column) => column.to_string(),
                    None => (self.name_mapping)(field.name),
                }),
                FieldKind::Skip | FieldKind::Flatten(_) => None,
            })
            .collect();

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert(computed).clone()
    }

    pub fn tags_of<R: Record>(&self) -> Tags {
        self.tags(R::shape())
    }

    /// Column names of a record, flattened depth-first, skipped fields omitted.
    ///
    /// Handy for building SELECT lists: `select(cache.column_names::<User>())`.
    pub fn column_names<R: Record>(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(R::shape(), &mut out);
        out
    }

    fn collect_names(&self, shape: &'static Shape, out: &mut Vec<String>) {
        let tags = self.tags(shape);
        for (field, tag) in shape.fields.iter().zip(tags.iter()) {
            match (field.kind, tag) {
                (FieldKind::Leaf, Some(tag)) => out.push(tag.clone()),
                (FieldKind::Flatten(inner), _) => self.collect_names(inner(), out),
                _ => {}
            }
        }
    }

    /// Field path for `column`: the first matching leaf in depth-first order.
    pub fn resolve(&self, shape: &'static Shape, column: &str) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        self.find(shape, column, &mut path).then_some(path)
    }

    fn find(&self, shape: &'static Shape, column: &str, path: &mut Vec<usize>) -> bool {
        let tags = self.tags(shape);
        for (i, (field, tag)) in shape.fields.iter().zip(tags.iter()).enumerate() {
            match field.kind {
                FieldKind::Leaf if tag.as_deref() == Some(column) => {
                    path.push(i);
                    return true;
                }
                FieldKind::Flatten(inner) => {
                    path.push(i);
                    if self.find(inner(), column, path) {
                        return true;
                    }
                    path.pop();
                }
                _ => {}
            }
        }
        false
    }

    /// Values of `record` for `columns`, in column order.
    ///
    /// Columns are matched like loaded columns are; a column with no matching
    /// field binds NULL.
    pub fn values_of<R: Record>(
        &self,
        record: &R,
        columns: &[String],
    ) -> RenderResult<Vec<Value>> {
        let shape = R::shape();
        columns
            .iter()
            .map(|column| {
                let path = self.resolve(shape, column);
                match path.and_then(|path| record_field(record, &path)) {
                    Some(field) => field.encode(),
                    None => Ok(Value::Null),
                }
            })
            .collect()
    }

    /// Number of cached record types.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column bindings for a record: the field path of each column, if any.
///
/// Called by derived [`Element`](super::Element) impls.
pub fn bind_record<R: Record>(tags: &TagCache, columns: &[String]) -> Vec<Option<Vec<usize>>> {
    let shape = R::shape();
    columns
        .iter()
        .map(|column| tags.resolve(shape, column))
        .collect()
}

/// Follow `path` through nested records down to a leaf.
///
/// Called by derived [`Element`](super::Element) impls.
pub fn record_slot<'a>(fields: &'a mut dyn Fields, path: &[usize]) -> Option<&'a mut dyn Scan> {
    let (first, rest) = path.split_first()?;
    match fields.field_mut(*first)? {
        FieldMut::Leaf(scan) if rest.is_empty() => Some(scan),
        FieldMut::Nested(inner) => record_slot(inner, rest),
        FieldMut::Leaf(_) => None,
    }
}

/// Read-only counterpart of [`record_slot`].
pub fn record_field<'a>(fields: &'a dyn Fields, path: &[usize]) -> Option<&'a dyn Encode> {
    let (first, rest) = path.split_first()?;
    match fields.field_ref(*first)? {
        FieldRef::Leaf(field) if rest.is_empty() => Some(field),
        FieldRef::Nested(inner) => record_field(inner, rest),
        FieldRef::Leaf(_) => None,
    }
}
