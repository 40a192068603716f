use super::*;
use crate::error::{ColumnError, CursorError, DecodeError, LoadError};
use crate::value::Value;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// Hand-written record impls, equivalent to what `#[derive(Record)]` emits.

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
}

static USER_SHAPE: Shape = Shape {
    type_name: "User",
    type_id: TypeId::of::<User>,
    fields: &[
        FieldSpec {
            name: "id",
            column: None,
            kind: FieldKind::Leaf,
        },
        FieldSpec {
            name: "name",
            column: None,
            kind: FieldKind::Leaf,
        },
    ],
};

impl Fields for User {
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        match index {
            0 => Some(FieldMut::Leaf(&mut self.id)),
            1 => Some(FieldMut::Leaf(&mut self.name)),
            _ => None,
        }
    }

    fn field_ref(&self, index: usize) -> Option<FieldRef<'_>> {
        match index {
            0 => Some(FieldRef::Leaf(&self.id)),
            1 => Some(FieldRef::Leaf(&self.name)),
            _ => None,
        }
    }
}

impl Record for User {
    fn shape() -> &'static Shape {
        &USER_SHAPE
    }
}

impl Element for User {
    fn bind(tags: &TagCache, columns: &[String]) -> Vec<Option<Vec<usize>>> {
        bind_record::<Self>(tags, columns)
    }

    fn slot(&mut self, path: &[usize]) -> Option<&mut dyn Scan> {
        record_slot(self, path)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Audit {
    created_by: String,
    note: Option<String>,
}

static AUDIT_SHAPE: Shape = Shape {
    type_name: "Audit",
    type_id: TypeId::of::<Audit>,
    fields: &[
        FieldSpec {
            name: "created_by",
            column: None,
            kind: FieldKind::Leaf,
        },
        FieldSpec {
            name: "note",
            column: None,
            kind: FieldKind::Leaf,
        },
    ],
};

impl Fields for Audit {
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        match index {
            0 => Some(FieldMut::Leaf(&mut self.created_by)),
            1 => Some(FieldMut::Leaf(&mut self.note)),
            _ => None,
        }
    }

    fn field_ref(&self, index: usize) -> Option<FieldRef<'_>> {
        match index {
            0 => Some(FieldRef::Leaf(&self.created_by)),
            1 => Some(FieldRef::Leaf(&self.note)),
            _ => None,
        }
    }
}

impl Record for Audit {
    fn shape() -> &'static Shape {
        &AUDIT_SHAPE
    }
}

impl Element for Audit {
    fn bind(tags: &TagCache, columns: &[String]) -> Vec<Option<Vec<usize>>> {
        bind_record::<Self>(tags, columns)
    }

    fn slot(&mut self, path: &[usize]) -> Option<&mut dyn Scan> {
        record_slot(self, path)
    }
}

/// `title` is tagged `headline`, `audit` is flattened, `cached` is skipped and
/// `note` collides with `audit.note`.
#[derive(Debug, Default, Clone, PartialEq)]
struct Post {
    id: i64,
    title: String,
    audit: Audit,
    cached: String,
    note: Option<String>,
}

fn audit_shape() -> &'static Shape {
    Audit::shape()
}

static POST_SHAPE: Shape = Shape {
    type_name: "Post",
    type_id: TypeId::of::<Post>,
    fields: &[
        FieldSpec {
            name: "id",
            column: None,
            kind: FieldKind::Leaf,
        },
        FieldSpec {
            name: "title",
            column: Some("headline"),
            kind: FieldKind::Leaf,
        },
        FieldSpec {
            name: "audit",
            column: None,
            kind: FieldKind::Flatten(audit_shape),
        },
        FieldSpec {
            name: "cached",
            column: None,
            kind: FieldKind::Skip,
        },
        FieldSpec {
            name: "note",
            column: None,
            kind: FieldKind::Leaf,
        },
    ],
};

impl Fields for Post {
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        match index {
            0 => Some(FieldMut::Leaf(&mut self.id)),
            1 => Some(FieldMut::Leaf(&mut self.title)),
            2 => Some(FieldMut::Nested(&mut self.audit)),
            4 => Some(FieldMut::Leaf(&mut self.note)),
            _ => None,
        }
    }

    fn field_ref(&self, index: usize) -> Option<FieldRef<'_>> {
        match index {
            0 => Some(FieldRef::Leaf(&self.id)),
            1 => Some(FieldRef::Leaf(&self.title)),
            2 => Some(FieldRef::Nested(&self.audit)),
            4 => Some(FieldRef::Leaf(&self.note)),
            _ => None,
        }
    }
}

impl Record for Post {
    fn shape() -> &'static Shape {
        &POST_SHAPE
    }
}

impl Element for Post {
    fn bind(tags: &TagCache, columns: &[String]) -> Vec<Option<Vec<usize>>> {
        bind_record::<Self>(tags, columns)
    }

    fn slot(&mut self, path: &[usize]) -> Option<&mut dyn Scan> {
        record_slot(self, path)
    }
}

fn users() -> RowSet {
    RowSet::new(["id", "name"])
        .row([Value::from(1), Value::from("a")])
        .row([Value::from(2), Value::from("x")])
        .row([Value::from(1), Value::from("b")])
}

fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
    }
}

/// Cursor whose failures are scripted.
struct Broken {
    columns_fail: bool,
}

impl Cursor for Broken {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        if self.columns_fail {
            Err(CursorError::Other("connection reset".into()))
        } else {
            Ok(vec!["id".into()])
        }
    }

    fn next_row(&mut self) -> Result<bool, CursorError> {
        Err(CursorError::Other("connection reset".into()))
    }

    fn decode_row(&mut self, _sink: &mut dyn RowSink) -> Result<(), ColumnError> {
        Ok(())
    }
}

/// One row whose `price` column cannot be decoded, like a backend type with no
/// `Value` mapping. Reading it fails unless the sink discards it.
struct Opaque {
    done: bool,
}

impl Cursor for Opaque {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        Ok(vec!["id".into(), "price".into(), "name".into()])
    }

    fn next_row(&mut self) -> Result<bool, CursorError> {
        let more = !self.done;
        self.done = true;
        Ok(more)
    }

    fn decode_row(&mut self, sink: &mut dyn RowSink) -> Result<(), ColumnError> {
        let row = [Value::Int(7), Value::Null, Value::from("seven")];
        for (index, value) in row.iter().enumerate() {
            if index == 1 && sink.wants(index) {
                return Err(ColumnError {
                    index,
                    source: DecodeError::invalid("unsupported column type numeric"),
                });
            }
            sink.column(index, value)
                .map_err(|source| ColumnError { index, source })?;
        }
        Ok(())
    }
}

#[test]
fn test_sink_wants_only_bound_columns() {
    let tags = TagCache::new();
    let columns: Vec<String> = ["id", "price", "name"].map(String::from).to_vec();

    let plain = bindings::<User>(&tags, &columns, false);
    let mut user = User::default();
    let target = RowTarget::<Discard, User> {
        key: None,
        element: &mut user,
        bindings: &plain,
    };
    assert!(target.wants(0));
    assert!(!target.wants(1));
    assert!(target.wants(2));
    assert!(!target.wants(3));

    let keyed = bindings::<User>(&tags, &columns, true);
    let mut key = String::new();
    let mut user = User::default();
    let target = RowTarget {
        key: Some(&mut key),
        element: &mut user,
        bindings: &keyed,
    };
    assert!(target.wants(0));
    assert!(!target.wants(1));
}

#[test]
fn test_undecodable_unmatched_column_is_skipped() {
    let mut out: Vec<User> = Vec::new();
    load(&mut Opaque { done: false }, &mut out).unwrap();
    assert_eq!(out, vec![user(7, "seven")]);

    // a scalar destination binds only the first column
    let mut ids: Vec<i64> = Vec::new();
    load(&mut Opaque { done: false }, &mut ids).unwrap();
    assert_eq!(ids, vec![7]);

    // a value-only map takes `price` as its element and fails on it
    let mut by_id: HashMap<i64, i64> = HashMap::new();
    let err = load(&mut Opaque { done: false }, &mut by_id).unwrap_err();
    assert!(matches!(err, LoadError::ScanFailed { ref column, .. } if column == "price"));
}

#[test]
fn test_sequence_of_records() {
    let mut out: Vec<User> = Vec::new();
    let n = load(&mut users(), &mut out).unwrap();

    assert_eq!(n, 3);
    assert_eq!(out, vec![user(1, "a"), user(2, "x"), user(1, "b")]);
}

#[test]
fn test_sequence_appends() {
    let mut out = vec![user(9, "kept")];
    load(&mut users(), &mut out).unwrap();

    assert_eq!(out.len(), 4);
    assert_eq!(out[0], user(9, "kept"));
}

#[test]
fn test_keyed_map_last_write_wins() {
    let mut out: HashMap<i64, String> = HashMap::new();
    out.insert(99, "stale".into());

    let n = load(&mut users(), &mut out).unwrap();

    assert_eq!(n, 3);
    assert_eq!(out.len(), 2);
    assert_eq!(out[&1], "b");
    assert_eq!(out[&2], "x");
    assert!(!out.contains_key(&99), "map destinations start empty");
}

#[test]
fn test_keyed_map_of_sequences_groups_in_order() {
    let mut rows = RowSet::new(["team", "id", "name"])
        .row([Value::from("red"), Value::from(1), Value::from("a")])
        .row([Value::from("blue"), Value::from(2), Value::from("b")])
        .row([Value::from("red"), Value::from(3), Value::from("c")]);

    let mut out: HashMap<String, Vec<User>> = HashMap::new();
    load(&mut rows, &mut out).unwrap();

    assert_eq!(out["red"], vec![user(1, "a"), user(3, "c")]);
    assert_eq!(out["blue"], vec![user(2, "b")]);
}

#[test]
fn test_btree_map_of_records() {
    let mut rows = RowSet::new(["key", "id", "name"])
        .row([Value::from("k2"), Value::from(2), Value::from("b")])
        .row([Value::from("k1"), Value::from(1), Value::from("a")]);

    let mut out: BTreeMap<String, User> = BTreeMap::new();
    load(&mut rows, &mut out).unwrap();

    let keys: Vec<_> = out.keys().cloned().collect();
    assert_eq!(keys, vec!["k1", "k2"]);
    assert_eq!(out["k1"], user(1, "a"));
}

#[test]
fn test_single_keeps_last_row() {
    let mut rows = RowSet::new(["count"])
        .row([Value::from(42)])
        .row([Value::from(43)]);

    let mut n = 0i64;
    assert_eq!(load(&mut rows, &mut n).unwrap(), 2);
    assert_eq!(n, 43);

    let mut u = User::default();
    load(&mut users(), &mut u).unwrap();
    assert_eq!(u, user(1, "b"));
}

#[test]
fn test_single_without_rows_is_untouched() {
    let mut rows = RowSet::new(["count"]);
    let mut n = 7i64;

    assert_eq!(load(&mut rows, &mut n).unwrap(), 0);
    assert_eq!(n, 7);
}

#[test]
fn test_scalar_sequence_reads_first_column() {
    let mut rows = RowSet::new(["name", "id"])
        .row([Value::from("a"), Value::from(1)])
        .row([Value::from("b"), Value::from(2)]);
    let mut out: Vec<String> = Vec::new();
    load(&mut rows, &mut out).unwrap();
    assert_eq!(out, vec!["a", "b"]);
}

#[test]
fn test_flatten_skip_and_explicit_tag() {
    let mut rows = RowSet::new(["id", "headline", "created_by", "note", "cached", "extra"]).row([
        Value::from(5),
        Value::from("Hello"),
        Value::from("ann"),
        Value::from("draft"),
        Value::from("ignored"),
        Value::from(true),
    ]);

    let mut post = Post::default();
    load(&mut rows, &mut post).unwrap();

    assert_eq!(post.id, 5);
    assert_eq!(post.title, "Hello");
    assert_eq!(post.audit.created_by, "ann");
    // first match in depth-first order is the flattened field
    assert_eq!(post.audit.note.as_deref(), Some("draft"));
    assert_eq!(post.note, None);
    assert_eq!(post.cached, "");
}

#[test]
fn test_scan_failure_names_column() {
    let mut rows = RowSet::new(["id", "name"]).row([Value::from("one"), Value::from("a")]);
    let mut out: Vec<User> = Vec::new();

    let err = load(&mut rows, &mut out).unwrap_err();
    assert!(err.is_scan_failure());
    match err {
        LoadError::ScanFailed { column, source } => {
            assert_eq!(column, "id");
            assert_eq!(
                source,
                DecodeError::TypeMismatch {
                    expected: "i64",
                    found: "text"
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(out.is_empty());
}

#[test]
fn test_null_into_non_nullable_fails() {
    let mut rows = RowSet::new(["id", "name"]).row([Value::from(1), Value::Null]);
    let mut out: Vec<User> = Vec::new();

    let err = load(&mut rows, &mut out).unwrap_err();
    assert!(matches!(
        err,
        LoadError::ScanFailed {
            ref column,
            source: DecodeError::UnexpectedNull,
        } if column == "name"
    ));
}

#[test]
fn test_rows_before_failure_stay_committed() {
    let mut rows = users().row([Value::Null, Value::from("z")]);
    let mut out: Vec<User> = Vec::new();

    assert!(load(&mut rows, &mut out).is_err());
    assert_eq!(out.len(), 3);
}

#[test]
fn test_keyed_destination_needs_a_column() {
    let mut rows = RowSet::new(Vec::<String>::new());
    let mut out: HashMap<i64, User> = HashMap::new();

    let err = load(&mut rows, &mut out).unwrap_err();
    assert!(matches!(err, LoadError::InvalidDestination(_)));
}

#[test]
fn test_column_introspection_failure() {
    let mut out: Vec<i64> = Vec::new();
    let err = load(&mut Broken { columns_fail: true }, &mut out).unwrap_err();
    assert!(matches!(err, LoadError::ColumnIntrospectionFailed(_)));
}

#[test]
fn test_fetch_failure() {
    let mut out: Vec<i64> = Vec::new();
    let err = load(&mut Broken { columns_fail: false }, &mut out).unwrap_err();
    assert!(matches!(err, LoadError::Fetch(CursorError::Other(_))));
}

#[test]
fn test_destination_shapes() {
    assert_eq!(<i64 as Destination>::SHAPE, DestinationShape::Single);
    assert_eq!(<User as Destination>::SHAPE, DestinationShape::Single);
    assert_eq!(<Vec<User> as Destination>::SHAPE, DestinationShape::Sequence);
    assert_eq!(
        <HashMap<i64, User> as Destination>::SHAPE,
        DestinationShape::KeyedMap
    );
    assert_eq!(
        <BTreeMap<i64, Vec<User>> as Destination>::SHAPE,
        DestinationShape::KeyedMapOfSequences
    );
    assert!(DestinationShape::KeyedMap.is_keyed());
    assert!(!DestinationShape::Sequence.is_keyed());
}

#[test]
fn test_column_names_flatten_and_skip() {
    let cache = TagCache::new();
    assert_eq!(
        cache.column_names::<Post>(),
        vec!["id", "headline", "created_by", "note", "note"]
    );
    assert_eq!(cache.column_names::<User>(), vec!["id", "name"]);
}

#[test]
fn test_tags_are_memoized() {
    let cache = TagCache::new();
    assert!(cache.is_empty());

    let first = cache.tags_of::<User>();
    let second = cache.tags_of::<User>();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!(&*first, &[Some("id".to_string()), Some("name".to_string())]);
}

fn shout(name: &str) -> String {
    name.to_uppercase()
}

#[test]
fn test_custom_name_mapping_keeps_explicit_tags() {
    let cache = TagCache::with_name_mapping(shout);
    let tags = cache.tags_of::<Post>();

    assert_eq!(
        &*tags,
        &[
            Some("ID".to_string()),
            Some("headline".to_string()),
            None,
            None,
            Some("NOTE".to_string()),
        ]
    );

    let loader = Loader::with_tags(Arc::new(cache));
    let mut rows = RowSet::new(["ID", "headline"]).row([Value::from(3), Value::from("t")]);
    let mut post = Post::default();
    loader.load(&mut rows, &mut post).unwrap();
    assert_eq!((post.id, post.title.as_str()), (3, "t"));
}

#[test]
fn test_resolve_paths() {
    let cache = TagCache::new();
    assert_eq!(cache.resolve(Post::shape(), "headline"), Some(vec![1]));
    assert_eq!(cache.resolve(Post::shape(), "created_by"), Some(vec![2, 0]));
    assert_eq!(cache.resolve(Post::shape(), "cached"), None);
    assert_eq!(cache.resolve(Post::shape(), "title"), None);
}

#[test]
fn test_values_follow_column_resolution() {
    let post = Post {
        id: 5,
        title: "Hello".into(),
        audit: Audit {
            created_by: "ann".into(),
            note: Some("draft".into()),
        },
        cached: "x".into(),
        note: Some("own".into()),
    };
    let cache = TagCache::new();
    let columns = ["headline", "note", "cached", "created_by"].map(String::from);

    let values = cache.values_of(&post, &columns).unwrap();
    assert_eq!(
        values,
        vec![
            Value::from("Hello"),
            Value::from("draft"),
            Value::Null,
            Value::from("ann"),
        ]
    );
}

#[test]
fn test_insert_record_uses_record_columns() {
    use crate::dialect::Postgres;
    use crate::fragment::Fragment;
    use crate::stmt::insert_into;

    let post = Post {
        id: 5,
        title: "Hello".into(),
        note: None,
        ..Post::default()
    };
    let built = insert_into("posts").record(&post).build(&Postgres).unwrap();
    assert_eq!(
        built.sql,
        r#"INSERT INTO "posts" ("id", "headline", "created_by", "note", "note") VALUES ($1, $2, $3, $4, $5)"#
    );
    assert_eq!(
        built.values,
        vec![
            Value::Int(5),
            Value::from("Hello"),
            Value::from(""),
            Value::Null,
            Value::Null,
        ]
    );

    let built = insert_into("posts")
        .columns(["id", "headline"])
        .record(&post)
        .record(&Post { id: 6, ..post.clone() })
        .build(&Postgres)
        .unwrap();
    assert_eq!(
        built.sql,
        r#"INSERT INTO "posts" ("id", "headline") VALUES ($1, $2), ($3, $4)"#
    );
    assert_eq!(built.values[2], Value::Int(6));
}

#[test]
fn test_tag_cache_concurrent_access() {
    let cache = Arc::new(TagCache::new());

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    let tags = cache.tags_of::<Post>();
                    let path = cache.resolve(Post::shape(), "note");
                    (tags, path)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (tags, path) in &results {
            assert_eq!(tags, &results[0].0);
            assert_eq!(path.as_deref(), Some(&[2, 1][..]));
        }
    });

    // Post and the flattened Audit
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_shared_loader_reuses_cache() {
    let loader = Loader::new();
    let mut a: Vec<User> = Vec::new();
    let mut b: HashMap<i64, User> = HashMap::new();

    loader.load(&mut users(), &mut a).unwrap();
    let mut keyed =
        RowSet::new(["k", "id", "name"]).row([Value::from(1), Value::from(1), Value::from("a")]);
    loader.load(&mut keyed, &mut b).unwrap();

    assert_eq!(loader.tags().len(), 1);
    assert_eq!(b[&1], user(1, "a"));
}

#[test]
fn test_rowset_without_current_row() {
    struct Sink;
    impl RowSink for Sink {
        fn column(&mut self, _index: usize, _value: &Value) -> Result<(), DecodeError> {
            Ok(())
        }
    }

    let mut rows = users();
    assert!(rows.decode_row(&mut Sink).is_err());

    while rows.next_row().unwrap() {}
    assert!(!rows.next_row().unwrap());
    assert!(rows.decode_row(&mut Sink).is_err());

    rows.rewind();
    assert!(rows.next_row().unwrap());
    assert!(rows.decode_row(&mut Sink).is_ok());
}

#[test]
fn test_keyed_map_of_scalar_sequences() {
    let mut rows = RowSet::new(["id", "name"])
        .row([Value::from(1), Value::from("a")])
        .row([Value::from(1), Value::from("b")])
        .row([Value::from(2), Value::from("c")]);

    let mut out: HashMap<i64, Vec<String>> = HashMap::new();
    assert_eq!(load(&mut rows, &mut out).unwrap(), 3);

    assert_eq!(out.len(), 2);
    assert_eq!(out[&1], vec!["a", "b"]);
    assert_eq!(out[&2], vec!["c"]);
}
