//! `#` line comments → `/* */` block comments.
//!
//! MySQL accepts `#` as a line comment marker; SQLite does not. The text is
//! scanned left to right, skipping quoted literals and the comments SQLite
//! already understands (`/* */` and `-- `), so only a top-level `#` opens a
//! comment.

use super::scanner::{line_end, skip_comment, skip_literal};

/// MySQL line comment marker.
pub const LINE_MARKER: u8 = b'#';

/// Rewrite every top-level `#` comment into a block comment.
pub fn translate_comments(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == LINE_MARKER {
            let end = line_end(sql, i);
            // `\r\n` endings keep their carriage return after the block
            let body_end = if bytes[end - 1] == b'\r' { end - 1 } else { end };
            out.push_str(&sql[last..i]);
            out.push_str("/*");
            // a literal "*/" would end the block early
            out.push_str(&sql[i + 1..body_end].replace("*/", "* /"));
            out.push_str("*/");
            last = body_end;
            i = end;
            continue;
        }
        match skip_literal(sql, i).or_else(|| skip_comment(sql, i)) {
            Some(next) => i = next,
            None => i += 1,
        }
    }
    out.push_str(&sql[last..]);
    out
}
