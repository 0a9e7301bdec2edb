//! Function names that differ between MySQL and SQLite.

use super::scanner::find_keyword;

/// MySQL spelling (with the opening parenthesis) → SQLite spelling.
///
/// `stdev` is not built into SQLite; it is registered on every embedded
/// connection by [`crate::sqlite_functions::register_functions`].
pub const FUNCTION_RENAMES: &[(&str, &str)] = &[
    ("if(", "iif("),
    ("std(", "stdev("),
    ("stddev(", "stdev("),
];

/// Rename function calls outside quoted literals.
///
/// A name only matches when preceded by a non-identifier character, so
/// `x, if(` and ` if(` are renamed while `iif(` and `my_std(` are not.
pub fn translate_function_names(sql: &str) -> String {
    let mut out = sql.to_string();
    for (from, to) in FUNCTION_RENAMES {
        let mut cursor = 0;
        while let Some(at) = find_keyword(&out, from, cursor) {
            out.replace_range(at..at + from.len(), to);
            cursor = at + to.len();
        }
    }
    out
}
