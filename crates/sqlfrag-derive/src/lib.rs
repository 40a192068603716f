//! Derive macros for sqlfrag
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive the row-loading traits (`Fields`, `Record`, `Element`) for a struct.
///
/// Leaf fields must implement `Decode` for loading and `Encode` for
/// `Insert::record`.
///
/// # Example
///
/// ```ignore
/// use sqlfrag::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct User {
///     id: i64,
///     #[sql(column = "user_name")]
///     name: String,
///     #[sql(flatten)]
///     audit: Audit,
///     #[sql(skip)]
///     cached_score: f64,
/// }
/// ```
///
/// # Attributes
///
/// - `#[sql(column = "name")]` - Map field to a different column name
/// - `#[sql(column = "-")]` or `#[sql(skip)]` - Never map the field
/// - `#[sql(flatten)]` - Search the fields of an embedded record as if they were this record's
///
/// Untagged fields use the snake_case form of the field name. The struct must
/// implement `Default` and have no generic parameters.
#[proc_macro_derive(Record, attributes(sql))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
