//! Bracket and quote matching over raw SQL text.
//!
//! Every delimiter the scanner cares about is ASCII, so all positions are
//! byte offsets that are guaranteed to sit on `char` boundaries.
//!
//! Quoted literals and comments (`/* */`, `# ...`, `-- ...`) are opaque: no
//! search or bracket match looks inside them.

use std::ops::Range;

const QUOTES: [u8; 3] = [b'\'', b'"', b'`'];

pub(crate) fn is_quote(b: u8) -> bool {
    QUOTES.contains(&b)
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

fn opener_for(close: u8) -> Option<u8> {
    match close {
        b')' => Some(b'('),
        b']' => Some(b'['),
        b'}' => Some(b'{'),
        _ => None,
    }
}

/// Identifier characters. Non-ASCII bytes count so that multibyte names never split.
pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Slice `text[start..end]`, widened outward to the nearest `char` boundaries.
pub(crate) fn snippet(text: &str, start: usize, end: usize) -> &str {
    let mut start = start.min(text.len());
    let mut end = end.clamp(start, text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    while !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

/// Find the delimiter that closes the one at `open`.
///
/// Brackets (`(`, `[`, `{`) nest, and quoted literals inside them are skipped.
/// Quotes (`'`, `"`, `` ` ``) close at the next occurrence of the same
/// character; escaped or doubled quotes are not recognized.
///
/// Returns `None` when `open` is not an opening delimiter, when a closing
/// bracket of the wrong kind is met, or when the text ends first.
pub fn find_closing(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let opener = *bytes.get(open)?;

    if is_quote(opener) {
        return bytes[open + 1..]
            .iter()
            .position(|&b| b == opener)
            .map(|i| open + 1 + i);
    }

    closer_for(opener)?;
    let mut stack = vec![opener];
    let mut i = open + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) {
            i = find_closing(text, i)? + 1;
            continue;
        }
        if let Some(next) = skip_comment(text, i) {
            i = next;
            continue;
        }
        if closer_for(b).is_some() {
            stack.push(b);
        } else if let Some(expected_open) = opener_for(b) {
            let top = stack.pop()?;
            if top != expected_open {
                return None;
            }
            if stack.is_empty() {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Mirror of [`find_closing`]: find the delimiter that opens the one at `close`.
pub fn find_opening(text: &str, close: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let closer = *bytes.get(close)?;
    let regions = opaque_regions(text);

    if is_quote(closer) {
        return region_at(&regions, close)
            .filter(|r| r.end == close + 1 && bytes[r.start] == closer)
            .map(|r| r.start);
    }

    opener_for(closer)?;
    let mut stack = vec![closer];
    let mut i = close;
    while i > 0 {
        i -= 1;
        if let Some(region) = region_at(&regions, i) {
            i = region.start;
            continue;
        }
        let b = bytes[i];
        if opener_for(b).is_some() {
            stack.push(b);
        } else if let Some(expected_close) = closer_for(b) {
            let top = stack.pop()?;
            if top != expected_close {
                return None;
            }
            if stack.is_empty() {
                return Some(i);
            }
        }
    }
    None
}

/// If a quoted literal starts at `i`, return the index just past its closing quote.
pub(crate) fn skip_literal(text: &str, i: usize) -> Option<usize> {
    let b = *text.as_bytes().get(i)?;
    if !is_quote(b) {
        return None;
    }
    find_closing(text, i).map(|close| close + 1)
}

/// If a comment starts at `i`, return the index just past it.
///
/// A `/* */` block ends after its `*/` (or at the end of the text). `#` and
/// `-- ` comments end at the newline, which is not part of the comment.
pub(crate) fn skip_comment(text: &str, i: usize) -> Option<usize> {
    match text.as_bytes().get(i..)? {
        [b'/', b'*', ..] => Some(text[i + 2..].find("*/").map_or(text.len(), |p| i + 2 + p + 2)),
        [b'#', ..] => Some(line_end(text, i)),
        // MySQL needs whitespace after `--`; `a--b` is `a - -b`
        [b'-', b'-', rest @ ..] if rest.first().is_none_or(|b| b.is_ascii_whitespace()) => {
            Some(line_end(text, i))
        }
        _ => None,
    }
}

/// Index of the newline ending the line that holds `i`, or the text length.
pub(crate) fn line_end(text: &str, i: usize) -> usize {
    text[i..].find('\n').map_or(text.len(), |p| i + p)
}

/// If a literal or comment starts at `i`, return the index just past it.
pub(crate) fn skip_opaque(text: &str, i: usize) -> Option<usize> {
    skip_literal(text, i).or_else(|| skip_comment(text, i))
}

/// Byte ranges of every literal and comment, in text order.
pub(crate) fn opaque_regions(text: &str) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut i = 0;
    while i < text.len() {
        match skip_opaque(text, i) {
            Some(next) => {
                regions.push(i..next);
                i = next;
            }
            None => i += 1,
        }
    }
    regions
}

/// The region of `regions` that contains `i`, if any.
pub(crate) fn region_at(regions: &[Range<usize>], i: usize) -> Option<&Range<usize>> {
    let idx = regions.partition_point(|r| r.end <= i);
    regions.get(idx).filter(|r| r.contains(&i))
}

/// Does `keyword` occur at byte `i`, case-insensitively and on word boundaries?
///
/// Boundaries are only checked on the sides where the keyword itself ends in an
/// identifier character, so `"if("` matches `iif(` never but `x,if(` always.
pub(crate) fn keyword_at(text: &str, i: usize, keyword: &str) -> bool {
    let bytes = text.as_bytes();
    let kw = keyword.as_bytes();
    let Some(window) = bytes.get(i..i + kw.len()) else {
        return false;
    };
    if !window.eq_ignore_ascii_case(kw) {
        return false;
    }
    let first_is_ident = kw.first().is_some_and(|&b| is_ident_byte(b));
    let last_is_ident = kw.last().is_some_and(|&b| is_ident_byte(b));
    if first_is_ident && i > 0 && is_ident_byte(bytes[i - 1]) {
        return false;
    }
    if last_is_ident && bytes.get(i + kw.len()).is_some_and(|&b| is_ident_byte(b)) {
        return false;
    }
    true
}

/// Find the next occurrence of `keyword` at or after `from`, outside literals and comments.
///
/// An unterminated quote is treated as an ordinary character.
pub fn find_keyword(text: &str, keyword: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if let Some(next) = skip_opaque(text, i) {
            i = next;
            continue;
        }
        if keyword_at(text, i, keyword) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Split `text` on `sep` where it occurs outside brackets, literals and comments.
pub fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(next) = skip_opaque(text, i) {
            i = next;
            continue;
        }
        if closer_for(b).is_some() {
            depth += 1;
        } else if opener_for(b).is_some() {
            depth = depth.saturating_sub(1);
        } else if b == sep && depth == 0 {
            parts.push(&text[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_parens() {
        assert_eq!(find_closing("f(a)", 1), Some(3));
    }

    #[test]
    fn test_nested_brackets() {
        let sql = "select (a + (b * [c]) + {d}) from t";
        assert_eq!(find_closing(sql, 7), Some(27));
        assert_eq!(find_closing(sql, 12), Some(20));
    }

    #[test]
    fn test_deep_nesting() {
        let sql = format!("{}x{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(find_closing(&sql, 0), Some(sql.len() - 1));
        assert_eq!(find_closing(&sql, 39), Some(41));
    }

    #[test]
    fn test_quote_matches_next_occurrence() {
        let sql = "select 'it''s'";
        assert_eq!(find_closing(sql, 7), Some(10));
        assert_eq!(find_closing("\"a\"", 0), Some(2));
    }

    #[test]
    fn test_paren_inside_literal_ignored() {
        let sql = "f(')', x)";
        assert_eq!(find_closing(sql, 1), Some(8));
    }

    #[test]
    fn test_not_found() {
        assert_eq!(find_closing("f(a", 1), None);
        assert_eq!(find_closing("'abc", 0), None);
        assert_eq!(find_closing("abc", 0), None);
        assert_eq!(find_closing("abc", 99), None);
        assert_eq!(find_closing("(]", 0), None);
    }

    #[test]
    fn test_find_opening() {
        let sql = "x + (a, (b)) - 'q'";
        assert_eq!(find_opening(sql, 11), Some(4));
        assert_eq!(find_opening(sql, 17), Some(15));
        assert_eq!(find_opening("a)", 1), None);
    }

    #[test]
    fn test_find_keyword_boundaries() {
        let sql = "select sample_interval, t + INTERVAL 1 second";
        assert_eq!(find_keyword(sql, "interval", 0), Some(28));
        assert_eq!(find_keyword("x, 'interval' y", "interval", 0), None);
        assert_eq!(find_keyword("a,if(b", "if(", 0), Some(2));
        assert_eq!(find_keyword("iif(b", "if(", 0), None);
    }

    #[test]
    fn test_comments_are_opaque() {
        assert_eq!(skip_comment("/* a */ b", 0), Some(7));
        assert_eq!(skip_comment("/* open", 0), Some(7));
        assert_eq!(skip_comment("# x\ny", 0), Some(3));
        assert_eq!(skip_comment("-- x\ny", 0), Some(4));
        assert_eq!(skip_comment("--", 0), Some(2));
        assert_eq!(skip_comment("a--b", 1), None);

        assert_eq!(find_keyword("t # add an interval later\n", "interval", 0), None);
        assert_eq!(find_keyword("t -- interval\n, interval", "interval", 0), Some(16));
        assert_eq!(find_keyword("/* interval */ interval", "interval", 0), Some(15));
    }

    #[test]
    fn test_brackets_inside_comments_ignored() {
        let sql = "f(a, # b)\n c)";
        assert_eq!(find_closing(sql, 1), Some(12));
        assert_eq!(find_opening(sql, 12), Some(1));
        assert_eq!(find_opening("(x /* ( */)", 10), Some(0));
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("SECOND, f(a, b), 'x,y'", b','),
            vec!["SECOND", " f(a, b)", " 'x,y'"]
        );
        assert_eq!(
            split_top_level("select 1; # a; b\nselect 2", b';'),
            vec!["select 1", " # a; b\nselect 2"]
        );
    }
}
