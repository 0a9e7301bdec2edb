//! `timestampdiff(SECOND, a, b)` → `((julianday(b) - julianday(a)) * 86400)`.

use super::scanner::{find_closing, find_keyword, snippet, split_top_level};
use crate::error::{TranslateError, TranslateResult};

const FUNC: &str = "timestampdiff";
const SECONDS_PER_DAY: u32 = 86400;

/// A decomposed `timestampdiff` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampDiff<'a> {
    pub unit: &'a str,
    pub start: &'a str,
    pub end: &'a str,
}

impl<'a> TimestampDiff<'a> {
    /// Split the text between the call's parentheses into its three arguments.
    pub fn parse(call: &'a str, args: &'a str) -> TranslateResult<Self> {
        let parts = split_top_level(args, b',');
        if parts.len() > 3 {
            return Err(TranslateError::unsupported(
                call,
                format!("TIMESTAMPDIFF takes 3 arguments, got {}", parts.len()),
            ));
        }
        let &[unit, start, end] = parts.as_slice() else {
            return Err(TranslateError::malformed(
                call,
                format!("TIMESTAMPDIFF takes 3 arguments, got {}", parts.len()),
            ));
        };
        let (unit, start, end) = (unit.trim(), start.trim(), end.trim());
        if start.is_empty() || end.is_empty() {
            return Err(TranslateError::malformed(call, "empty TIMESTAMPDIFF argument"));
        }
        if !unit.eq_ignore_ascii_case("second") {
            return Err(TranslateError::unsupported(
                call,
                format!(
                    "TIMESTAMPDIFF unit {} is not supported; only SECOND maps onto julianday arithmetic",
                    unit.to_ascii_uppercase()
                ),
            ));
        }
        Ok(Self { unit, start, end })
    }

    pub fn to_sqlite(&self) -> String {
        format!(
            "((julianday({}) - julianday({})) * {})",
            self.end, self.start, SECONDS_PER_DAY
        )
    }
}

/// Rewrite every `timestampdiff(...)` call outside quoted literals.
pub fn translate_timestampdiff(sql: &str) -> TranslateResult<String> {
    let mut out = sql.to_string();
    let mut cursor = 0;
    while let Some(at) = find_keyword(&out, FUNC, cursor) {
        let open = at
            + FUNC.len()
            + out[at + FUNC.len()..]
                .bytes()
                .take_while(u8::is_ascii_whitespace)
                .count();
        if out.as_bytes().get(open) != Some(&b'(') {
            // a column that happens to be called timestampdiff
            cursor = at + FUNC.len();
            continue;
        }
        let close = find_closing(&out, open).ok_or_else(|| {
            TranslateError::malformed(snippet(&out, at, out.len()), "unterminated TIMESTAMPDIFF call")
        })?;
        let rendered = TimestampDiff::parse(&out[at..=close], &out[open + 1..close])?.to_sqlite();
        out.replace_range(at..=close, &rendered);
        // arguments may hold further calls
        cursor = at;
    }
    Ok(out)
}
