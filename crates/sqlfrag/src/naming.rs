//! Default field-name to column-name mapping.

/// Convert a CamelCase field name to snake_case.
///
/// Every byte is lowercased. An underscore goes after byte `i` when the next byte
/// is uppercase and either byte `i` is lowercase or a digit, or the byte after
/// next is lowercase. Runs of capitals therefore stay together (`HTTPServer` →
/// `http_server`, `ID` → `id`). Only ASCII letters and digits are classified;
/// everything else is copied through.
pub fn to_snake_case(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 2);

    for (i, &b) in bytes.iter().enumerate() {
        out.push(b.to_ascii_lowercase());

        let Some(&next) = bytes.get(i + 1) else {
            continue;
        };
        if !next.is_ascii_uppercase() {
            continue;
        }
        let after_next_lower = bytes.get(i + 2).is_some_and(u8::is_ascii_lowercase);
        if b.is_ascii_lowercase() || b.is_ascii_digit() || after_next_lower {
            out.push(b'_');
        }
    }

    // Only ASCII bytes were changed or inserted, so UTF-8 sequences are intact.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
