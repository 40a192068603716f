//! Row loading: materialize query results into caller-supplied destinations.
//!
//! The destination's type decides how rows are stored:
//!
//! | destination | shape | per row |
//! |---|---|---|
//! | `T: Element` (scalar, [`Decode`] type or [`Record`]) | single | overwrite `T` |
//! | `Vec<T>` | sequence | append |
//! | `HashMap<K, T>` / `BTreeMap<K, T>` | keyed map | insert, last write wins |
//! | `HashMap<K, Vec<T>>` / `BTreeMap<K, Vec<T>>` | keyed map of sequences | append to the key's group |
//!
//! Keyed destinations always take their key from the **first** column; the
//! element is loaded from the remaining columns. Map destinations are cleared
//! before loading, sequences are appended to.
//!
//! Columns are matched to record fields through the [`TagCache`]. Columns that
//! match nothing are still read, into [`Discard`].

mod cursor;
mod decode;
mod tags;

pub use cursor::{Cursor, RowSet, RowSink};
pub use decode::{Decode, Discard, Encode, Json, Scan};
pub use tags::{
    FieldKind, FieldMut, FieldRef, FieldSpec, Fields, Record, Shape, TagCache, Tags, bind_record,
    record_field, record_slot,
};

use crate::error::{DecodeError, LoadError, LoadResult};
use crate::value::Value;
use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// A value that can be loaded from (part of) one row.
///
/// Implemented for every [`Decode`] type and, through `#[derive(Record)]`, for
/// records.
pub trait Element: Default + 'static {
    /// Field path of each column, `None` for columns this element does not take.
    fn bind(tags: &TagCache, columns: &[String]) -> Vec<Option<Vec<usize>>>;

    /// Scan target at `path`, as returned by [`Element::bind`].
    fn slot(&mut self, path: &[usize]) -> Option<&mut dyn Scan>;
}

impl<T: Decode + Default + 'static> Element for T {
    /// Scalars take the first column.
    fn bind(_tags: &TagCache, columns: &[String]) -> Vec<Option<Vec<usize>>> {
        (0..columns.len())
            .map(|i| (i == 0).then(Vec::new))
            .collect()
    }

    fn slot(&mut self, path: &[usize]) -> Option<&mut dyn Scan> {
        path.is_empty().then_some(self as &mut dyn Scan)
    }
}

/// How a destination stores rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationShape {
    Single,
    Sequence,
    KeyedMap,
    KeyedMapOfSequences,
}

impl DestinationShape {
    pub fn is_keyed(self) -> bool {
        matches!(self, Self::KeyedMap | Self::KeyedMapOfSequences)
    }
}

impl fmt::Display for DestinationShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Sequence => "sequence",
            Self::KeyedMap => "keyed map",
            Self::KeyedMapOfSequences => "keyed map of sequences",
        })
    }
}

/// Where one column of the result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Key,
    Field(Vec<usize>),
    Discard,
}

fn bindings<E: Element>(tags: &TagCache, columns: &[String], keyed: bool) -> Vec<Binding> {
    let (lead, rest) = if keyed {
        (Some(Binding::Key), columns.get(1..).unwrap_or_default())
    } else {
        (None, columns)
    };
    let fields = E::bind(tags, rest).into_iter().map(|path| match path {
        Some(path) => Binding::Field(path),
        None => Binding::Discard,
    });
    let out: Vec<Binding> = lead.into_iter().chain(fields).collect();

    for (column, binding) in columns.iter().zip(&out) {
        if *binding == Binding::Discard {
            tracing::trace!(
                target: "sqlfrag.load",
                column = %column,
                element = std::any::type_name::<E>(),
                "column has no matching field; discarding"
            );
        }
    }
    out
}

/// Routes the columns of one row to a key and an element.
struct RowTarget<'a, K, E> {
    key: Option<&'a mut K>,
    element: &'a mut E,
    bindings: &'a [Binding],
}

impl<K: Scan, E: Element> cursor::RowSink for RowTarget<'_, K, E> {
    fn wants(&self, index: usize) -> bool {
        match self.bindings.get(index) {
            Some(Binding::Key) => self.key.is_some(),
            Some(Binding::Field(_)) => true,
            Some(Binding::Discard) | None => false,
        }
    }

    fn column(&mut self, index: usize, value: &Value) -> Result<(), DecodeError> {
        let target: Option<&mut dyn Scan> = match self.bindings.get(index) {
            Some(Binding::Key) => self.key.as_deref_mut().map(|k| k as &mut dyn Scan),
            Some(Binding::Field(path)) => self.element.slot(path),
            Some(Binding::Discard) | None => None,
        };
        match target {
            Some(scan) => scan.scan(value),
            None => Discard.scan(value),
        }
    }
}

/// Drive `cursor` to the end. Each row is decoded into a fresh key and element
/// from `next`, then handed to `commit`.
fn each_row<K, E, F>(
    cursor: &mut dyn Cursor,
    columns: &[String],
    bindings: &[Binding],
    mut next: impl FnMut() -> (K, E),
    mut commit: F,
) -> LoadResult<usize>
where
    K: Scan,
    E: Element,
    F: FnMut(K, E),
{
    let mut count = 0;
    while cursor.next_row().map_err(LoadError::Fetch)? {
        let (mut key, mut element) = next();
        let mut target = RowTarget {
            key: Some(&mut key),
            element: &mut element,
            bindings,
        };
        decode_row(cursor, columns, &mut target)?;
        commit(key, element);
        count += 1;
    }
    Ok(count)
}

fn decode_row(
    cursor: &mut dyn Cursor,
    columns: &[String],
    sink: &mut dyn RowSink,
) -> LoadResult<()> {
    cursor.decode_row(sink).map_err(|e| LoadError::ScanFailed {
        column: columns
            .get(e.index)
            .cloned()
            .unwrap_or_else(|| format!("#{}", e.index)),
        source: e.source,
    })
}

/// A type rows can be loaded into.
pub trait Destination {
    const SHAPE: DestinationShape;

    /// Load every remaining row of `cursor`, whose columns are `columns`.
    fn load_rows(
        &mut self,
        tags: &TagCache,
        columns: &[String],
        cursor: &mut dyn Cursor,
    ) -> LoadResult<usize>;
}

impl<T: Element> Destination for T {
    const SHAPE: DestinationShape = DestinationShape::Single;

    fn load_rows(
        &mut self,
        tags: &TagCache,
        columns: &[String],
        cursor: &mut dyn Cursor,
    ) -> LoadResult<usize> {
        let bindings = bindings::<T>(tags, columns, false);
        let mut count = 0;
        while cursor.next_row().map_err(LoadError::Fetch)? {
            let mut target = RowTarget::<Discard, T> {
                key: None,
                element: &mut *self,
                bindings: &bindings,
            };
            decode_row(cursor, columns, &mut target)?;
            count += 1;
        }
        Ok(count)
    }
}

impl<T: Element> Destination for Vec<T> {
    const SHAPE: DestinationShape = DestinationShape::Sequence;

    fn load_rows(
        &mut self,
        tags: &TagCache,
        columns: &[String],
        cursor: &mut dyn Cursor,
    ) -> LoadResult<usize> {
        let bindings = bindings::<T>(tags, columns, false);
        each_row(
            cursor,
            columns,
            &bindings,
            || (Discard, T::default()),
            |_, element| self.push(element),
        )
    }
}

/// The value side of a keyed map destination.
pub trait MapValue: Sized {
    type Item: Element;
    const GROUPED: bool;

    fn fresh(item: Self::Item) -> Self;
    fn merge(&mut self, item: Self::Item);
}

impl<T: Element> MapValue for T {
    type Item = T;
    const GROUPED: bool = false;

    fn fresh(item: T) -> Self {
        item
    }

    fn merge(&mut self, item: T) {
        *self = item;
    }
}

impl<T: Element> MapValue for Vec<T> {
    type Item = T;
    const GROUPED: bool = true;

    fn fresh(item: T) -> Self {
        vec![item]
    }

    fn merge(&mut self, item: T) {
        self.push(item);
    }
}

const fn keyed_shape(grouped: bool) -> DestinationShape {
    if grouped {
        DestinationShape::KeyedMapOfSequences
    } else {
        DestinationShape::KeyedMap
    }
}

fn keyed_bindings<V: MapValue>(tags: &TagCache, columns: &[String]) -> LoadResult<Vec<Binding>> {
    if columns.is_empty() {
        return Err(LoadError::InvalidDestination(format!(
            "{} needs at least one column for its key",
            keyed_shape(V::GROUPED)
        )));
    }
    Ok(bindings::<V::Item>(tags, columns, true))
}

impl<K, V, S> Destination for HashMap<K, V, S>
where
    K: Decode + Default + Eq + Hash,
    V: MapValue,
    S: BuildHasher,
{
    const SHAPE: DestinationShape = keyed_shape(V::GROUPED);

    fn load_rows(
        &mut self,
        tags: &TagCache,
        columns: &[String],
        cursor: &mut dyn Cursor,
    ) -> LoadResult<usize> {
        let bindings = keyed_bindings::<V>(tags, columns)?;
        self.clear();
        each_row(
            cursor,
            columns,
            &bindings,
            || (K::default(), V::Item::default()),
            |key, item| match self.entry(key) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(item),
                Entry::Vacant(entry) => {
                    entry.insert(V::fresh(item));
                }
            },
        )
    }
}

impl<K, V> Destination for BTreeMap<K, V>
where
    K: Decode + Default + Ord,
    V: MapValue,
{
    const SHAPE: DestinationShape = keyed_shape(V::GROUPED);

    fn load_rows(
        &mut self,
        tags: &TagCache,
        columns: &[String],
        cursor: &mut dyn Cursor,
    ) -> LoadResult<usize> {
        let bindings = keyed_bindings::<V>(tags, columns)?;
        self.clear();
        each_row(
            cursor,
            columns,
            &bindings,
            || (K::default(), V::Item::default()),
            |key, item| match self.entry(key) {
                BTreeEntry::Occupied(mut entry) => entry.get_mut().merge(item),
                BTreeEntry::Vacant(entry) => {
                    entry.insert(V::fresh(item));
                }
            },
        )
    }
}

/// Loads cursors into destinations, sharing one [`TagCache`].
#[derive(Debug, Clone, Default)]
pub struct Loader {
    tags: Arc<TagCache>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(tags: Arc<TagCache>) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &TagCache {
        &self.tags
    }

    /// Load every row of `cursor` into `dest`, returning the number of rows read.
    ///
    /// Stops at the first error; rows committed before it stay in `dest`.
    pub fn load<D: Destination + ?Sized>(
        &self,
        cursor: &mut dyn Cursor,
        dest: &mut D,
    ) -> LoadResult<usize> {
        let columns = cursor
            .columns()
            .map_err(LoadError::ColumnIntrospectionFailed)?;
        let count = dest.load_rows(&self.tags, &columns, cursor)?;
        tracing::debug!(
            target: "sqlfrag.load",
            shape = %D::SHAPE,
            columns = columns.len(),
            rows = count,
            "loaded rows"
        );
        Ok(count)
    }
}

/// Load with a fresh [`TagCache`]. Prefer a shared [`Loader`] in long-lived code.
pub fn load<D: Destination + ?Sized>(cursor: &mut dyn Cursor, dest: &mut D) -> LoadResult<usize> {
    Loader::new().load(cursor, dest)
}

#[cfg(test)]
mod tests;
