//! Positional parameter markers: `%s` → `?`.

/// MySQL client-side placeholder.
pub const NETWORK_MARKER: &str = "%s";
/// SQLite (and sqlx MySQL) placeholder.
pub const EMBEDDED_MARKER: &str = "?";

/// Replace every placeholder, preserving order and count.
///
/// This is a plain token substitution: a `%s` inside a string literal is
/// rewritten too, so `like '%sfc%'` becomes `like '?fc%'`. Pass such
/// patterns as bound parameters (`like %s` with `"%sfc%"` bound) instead.
pub fn translate_markers(sql: &str) -> String {
    sql.replace(NETWORK_MARKER, EMBEDDED_MARKER)
}

/// Number of networked-dialect placeholders in `sql`.
pub fn count_markers(sql: &str) -> usize {
    sql.matches(NETWORK_MARKER).count()
}
