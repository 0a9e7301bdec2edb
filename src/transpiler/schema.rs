//! Drop `schema.` qualifiers; SQLite has a single namespace per file.

use super::scanner::{is_ident_byte, keyword_at, skip_literal};

/// Remove every `<schema>.` and `` `<schema>`. `` prefix outside string literals.
///
/// The qualifier must start a name: `my_hte_data.t` and `hte_data_old.t` are
/// left alone when the schema is `hte_data`.
pub fn strip_schema(sql: &str, schema: &str) -> String {
    if schema.is_empty() {
        return sql.to_string();
    }
    let plain = format!("{schema}.");
    let quoted = format!("`{schema}`.");
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    let mut stripped = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let starts_name = i == 0 || (!is_ident_byte(bytes[i - 1]) && bytes[i - 1] != b'.');
        if starts_name {
            let prefix = if keyword_at(sql, i, &quoted) {
                Some(quoted.len())
            } else if keyword_at(sql, i, &plain) {
                Some(plain.len())
            } else {
                None
            };
            if let Some(len) = prefix {
                out.push_str(&sql[last..i]);
                i += len;
                last = i;
                stripped += 1;
                continue;
            }
        }
        // string literals are data, backquoted names are not
        if matches!(bytes[i], b'\'' | b'"') {
            if let Some(next) = skip_literal(sql, i) {
                i = next;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&sql[last..]);

    if stripped > 0 {
        tracing::debug!(schema, stripped, "stripped schema qualifiers");
    }
    out
}
