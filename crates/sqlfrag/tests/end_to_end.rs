#![allow(dead_code)]

use sqlfrag::{
    Decode, DecodeError, Fragment, Loader, MySql, Postgres, Record, RowSet, TagCache, Value, expr,
    gt, in_list, insert_into, select,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Audit {
    created_by: String,
    #[sql(column = "updated")]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct User {
    id: i64,
    #[sql(column = "user_name")]
    name: String,
    #[sql(flatten)]
    audit: Audit,
    #[sql(skip)]
    score: f64,
    #[sql(column = "-")]
    cached: Option<String>,
}

/// Money stored as integer cents, read from either an integer or a decimal string.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Cents(i64);

impl Decode for Cents {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Int(i) => Ok(Cents(*i)),
            Value::Text(s) => {
                let (units, cents) = s.split_once('.').unwrap_or((s.as_str(), "0"));
                let units: i64 = units.parse().map_err(|_| DecodeError::invalid(s.clone()))?;
                let cents: i64 = format!("{cents:0<2}")[..2]
                    .parse()
                    .map_err(|_| DecodeError::invalid(s.clone()))?;
                Ok(Cents(units * 100 + cents))
            }
            Value::Null => Err(DecodeError::UnexpectedNull),
            other => Err(DecodeError::TypeMismatch {
                expected: "cents",
                found: other.kind(),
            }),
        }
    }
}

impl From<Cents> for Value {
    fn from(c: Cents) -> Self {
        Value::Int(c.0)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Order {
    id: i64,
    total: Cents,
}

fn user_rows(columns: &[String]) -> RowSet {
    let mut rows = RowSet::new(columns.iter().cloned());
    rows.push_row(vec![
        Value::from(1),
        Value::from("ann"),
        Value::from("admin"),
        Value::Null,
    ]);
    rows.push_row(vec![
        Value::from(2),
        Value::from("bob"),
        Value::from("ann"),
        Value::from("2024-05-06 07:08:09"),
    ]);
    rows
}

#[test]
fn select_with_expression_across_dialects() {
    let stmt = select(["a", "b"]).from("t").where_(expr("c = ?").bind(5));

    let mysql = stmt.build(&MySql).unwrap();
    assert_eq!(mysql.sql, "SELECT a, b FROM t WHERE c = ?");
    assert_eq!(mysql.values, vec![Value::Int(5)]);

    let pg = stmt.build(&Postgres).unwrap();
    assert_eq!(pg.sql, "SELECT a, b FROM t WHERE c = $1");
    assert_eq!(pg.values, vec![Value::Int(5)]);
}

#[test]
fn derived_column_names_drive_the_select_list() {
    let tags = TagCache::new();
    let columns = tags.column_names::<User>();
    assert_eq!(columns, vec!["id", "user_name", "created_by", "updated"]);

    let stmt = select(columns).from("users").where_(gt("id", 0));
    let built = stmt.build(&Postgres).unwrap();
    assert_eq!(
        built.sql,
        r#"SELECT id, user_name, created_by, updated FROM users WHERE "id" > $1"#
    );
}

#[test]
fn load_into_sequence() {
    let loader = Loader::new();
    let columns = loader.tags().column_names::<User>();

    let mut users: Vec<User> = Vec::new();
    let n = loader.load(&mut user_rows(&columns), &mut users).unwrap();

    assert_eq!(n, 2);
    assert_eq!(users[0].name, "ann");
    assert_eq!(users[0].audit.created_by, "admin");
    assert_eq!(users[0].audit.updated_at, None);
    assert_eq!(
        users[1].audit.updated_at.map(|t| t.to_rfc3339()),
        Some("2024-05-06T07:08:09+00:00".to_string())
    );
    assert_eq!(users[1].score, 0.0);
    assert_eq!(users[1].cached, None);
}

#[test]
fn load_into_keyed_maps() {
    let loader = Loader::new();
    let columns = loader.tags().column_names::<User>();

    let mut by_id: HashMap<i64, User> = HashMap::new();
    loader.load(&mut user_rows(&columns), &mut by_id).unwrap();
    assert_eq!(by_id.len(), 2);
    // the key column is not part of the element
    assert_eq!(by_id[&2].id, 0);
    assert_eq!(by_id[&2].name, "bob");

    let mut by_creator: BTreeMap<String, Vec<User>> = BTreeMap::new();
    let grouped = ["created_by", "id", "user_name"].map(String::from);
    let mut rows = RowSet::new(grouped.iter().cloned())
        .row([Value::from("ann"), Value::from(1), Value::from("x")])
        .row([Value::from("bob"), Value::from(2), Value::from("y")])
        .row([Value::from("ann"), Value::from(3), Value::from("z")]);
    loader.load(&mut rows, &mut by_creator).unwrap();

    let ann: Vec<i64> = by_creator["ann"].iter().map(|u| u.id).collect();
    assert_eq!(ann, vec![1, 3]);
    assert_eq!(by_creator["bob"].len(), 1);
}

#[test]
fn nested_subquery_shares_ordinals() {
    let orders = select(["user_id"]).from("orders").where_(gt("total", 100));
    let stmt = select(["id"])
        .from("users")
        .where_(gt("age", 18))
        .where_(in_list("id", orders));

    let built = stmt.build(&Postgres).unwrap();
    assert_eq!(
        built.sql,
        r#"SELECT id FROM users WHERE ("age" > $1) AND ("id" IN (SELECT user_id FROM orders WHERE "total" > $2))"#
    );
    assert_eq!(built.values, vec![Value::Int(18), Value::Int(100)]);

    let debug = stmt.to_debug_sql(&MySql).unwrap();
    assert_eq!(
        debug,
        "SELECT id FROM users WHERE (`age` > 18) AND (`id` IN (SELECT user_id FROM orders WHERE `total` > 100))"
    );
}

#[test]
fn custom_decodable_as_field_and_destination() {
    let loader = Loader::new();

    let mut orders: Vec<Order> = Vec::new();
    let mut rows = RowSet::new(["id", "total"])
        .row([Value::from(1), Value::from("12.34")])
        .row([Value::from(2), Value::from(500)]);
    loader.load(&mut rows, &mut orders).unwrap();
    assert_eq!(
        orders,
        vec![
            Order {
                id: 1,
                total: Cents(1234)
            },
            Order {
                id: 2,
                total: Cents(500)
            },
        ]
    );

    // a leaf is never searched for nested columns
    assert_eq!(loader.tags().column_names::<Order>(), vec!["id", "total"]);

    let mut totals: Vec<Cents> = Vec::new();
    let mut rows = RowSet::new(["total"]).row([Value::from(100)]);
    loader.load(&mut rows, &mut totals).unwrap();
    assert_eq!(totals, vec![Cents(100)]);

    let mut rows = RowSet::new(["id", "total"]).row([Value::from(3), Value::from(true)]);
    let err = loader.load(&mut rows, &mut orders).unwrap_err();
    assert!(err.is_scan_failure());
}

#[test]
fn insert_from_derived_record() {
    let user = User {
        id: 1,
        name: "ann".into(),
        audit: Audit {
            created_by: "admin".into(),
            updated_at: None,
        },
        score: 9.5,
        cached: Some("x".into()),
    };

    let built = insert_into("users")
        .record(&user)
        .returning(["id"])
        .build(&Postgres)
        .unwrap();
    assert_eq!(
        built.sql,
        r#"INSERT INTO "users" ("id", "user_name", "created_by", "updated") VALUES ($1, $2, $3, $4) RETURNING "id""#
    );
    assert_eq!(
        built.values,
        vec![
            Value::Int(1),
            Value::from("ann"),
            Value::from("admin"),
            Value::Null
        ]
    );

    let order = Order {
        id: 7,
        total: Cents(1999),
    };
    let built = insert_into("orders")
        .columns(["total", "id", "note"])
        .record(&order)
        .build(&MySql)
        .unwrap();
    assert_eq!(
        built.sql,
        "INSERT INTO `orders` (`total`, `id`, `note`) VALUES (?, ?, ?)"
    );
    assert_eq!(
        built.values,
        vec![Value::Int(1999), Value::Int(7), Value::Null]
    );
}
