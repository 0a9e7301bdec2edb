//! Date arithmetic: `t + interval 30 second` → `datetime(t, '+' || 30 || ' seconds')`.
//!
//! Chained terms sharing one base (`t - interval 5 second - interval 2 second`)
//! collapse into a single `datetime` call with one modifier per term, in
//! source order.

use std::fmt;
use std::ops::Range;

use super::scanner::{
    find_closing, find_keyword, find_opening, is_ident_byte, is_quote, keyword_at, opaque_regions,
    region_at, skip_comment, snippet,
};
use crate::error::{TranslateError, TranslateResult};

const INTERVAL: &str = "interval";

/// Words that end a base timestamp expression when scanning it from the left.
const BASE_STOP_WORDS: &[&str] = &[
    "select", "distinct", "where", "and", "or", "on", "when", "then", "else", "between", "not",
    "case", "having", "set", "values", "like", "is", "in", "return", "by",
];

/// MySQL units with no single SQLite modifier.
const UNSUPPORTED_UNITS: &[&str] = &[
    "microsecond",
    "week",
    "quarter",
    "second_microsecond",
    "minute_microsecond",
    "minute_second",
    "hour_microsecond",
    "hour_second",
    "hour_minute",
    "day_microsecond",
    "day_second",
    "day_minute",
    "day_hour",
    "year_month",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Plus => write!(f, "+"),
            Sign::Minus => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Unit {
    fn from_word(word: &str) -> Option<Self> {
        let unit = match word.to_ascii_lowercase().as_str() {
            "second" => Unit::Second,
            "minute" => Unit::Minute,
            "hour" => Unit::Hour,
            "day" => Unit::Day,
            "month" => Unit::Month,
            "year" => Unit::Year,
            _ => return None,
        };
        Some(unit)
    }

    /// SQLite date modifier suffix.
    pub fn modifier(&self) -> &'static str {
        match self {
            Unit::Second => "seconds",
            Unit::Minute => "minutes",
            Unit::Hour => "hours",
            Unit::Day => "days",
            Unit::Month => "months",
            Unit::Year => "years",
        }
    }
}

/// One signed offset, e.g. `- interval 5 second`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTerm<'a> {
    pub sign: Sign,
    pub amount: &'a str,
    pub unit: Unit,
}

impl IntervalTerm<'_> {
    /// Render as a SQLite modifier expression.
    ///
    /// Unsigned numeric literals keep the sign as text (`'-' || 5`). Any other
    /// amount may evaluate negative, and `'-' || -5` is no valid modifier, so
    /// the sign is folded into the value instead (`(-(a - b)) || ' seconds'`).
    /// `||` binds tighter than arithmetic in SQLite, so anything but a bare
    /// token is parenthesized.
    fn modifier(&self) -> String {
        let unit = self.unit.modifier();
        let amount = self.amount;
        let literal = amount.bytes().all(|b| b.is_ascii_digit() || b == b'.');
        if literal {
            return format!("'{}' || {} || ' {}'", self.sign, amount, unit);
        }

        let token = amount.bytes().all(|b| is_ident_byte(b) || b == b'.');
        match (self.sign, token) {
            (Sign::Plus, true) => format!("{} || ' {}'", amount, unit),
            (Sign::Plus, false) => format!("({}) || ' {}'", amount, unit),
            (Sign::Minus, true) => format!("(-{}) || ' {}'", amount, unit),
            (Sign::Minus, false) => format!("(-({})) || ' {}'", amount, unit),
        }
    }
}

/// A base timestamp with one or more chained interval terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalExpr<'a> {
    pub base: &'a str,
    pub terms: Vec<IntervalTerm<'a>>,
    /// Byte range of the source text this expression replaces.
    pub span: Range<usize>,
}

impl IntervalExpr<'_> {
    pub fn to_sqlite(&self) -> String {
        let modifiers: Vec<String> = self.terms.iter().map(|t| t.modifier()).collect();
        format!("datetime({}, {})", self.base, modifiers.join(", "))
    }
}

/// Where the base expression starts.
enum Boundary {
    /// Right after an unmatched opening bracket at this index.
    Group(usize),
    /// At this index (after a comma, operator or the start of the text).
    Plain(usize),
}

/// Rewrite every interval expression outside quoted literals.
pub fn translate_intervals(sql: &str) -> TranslateResult<String> {
    let mut out = sql.to_string();
    let mut cursor = 0;
    while let Some(kw) = find_keyword(&out, INTERVAL, cursor) {
        let (span, rendered) = {
            let expr = locate(&out, kw)?;
            (expr.span.clone(), expr.to_sqlite())
        };
        tracing::trace!(original = %&out[span.clone()], %rendered, "interval rewrite");
        out.replace_range(span.clone(), &rendered);
        cursor = span.start + rendered.len();
    }
    Ok(out)
}

/// Decompose the interval expression whose first `interval` keyword sits at `kw`.
pub fn locate(sql: &str, kw: usize) -> TranslateResult<IntervalExpr<'_>> {
    let bytes = sql.as_bytes();

    // sign immediately before the keyword
    let mut j = kw;
    while j > 0 && bytes[j - 1].is_ascii_whitespace() {
        j -= 1;
    }
    let sign = match j.checked_sub(1).map(|s| bytes[s]) {
        Some(b'+') => Sign::Plus,
        Some(b'-') => Sign::Minus,
        _ => {
            return Err(TranslateError::malformed(
                snippet(sql, j.saturating_sub(1), kw + INTERVAL.len()),
                "expected `+` or `-` before INTERVAL",
            ));
        }
    };
    let sign_at = j - 1;

    let regions = opaque_regions(sql);
    let boundary = base_boundary(sql, &regions, sign_at)?;
    let region_start = match boundary {
        Boundary::Group(open) => open + 1,
        Boundary::Plain(start) => start,
    };
    let base_start = skip_trivia(sql, cut_after_stop_words(sql, region_start, sign_at)).min(sign_at);
    let base = &sql[base_start..trim_trivia_end(sql, &regions, base_start, sign_at)];
    if base.is_empty() {
        return Err(TranslateError::malformed(
            snippet(sql, sign_at, kw + INTERVAL.len()),
            "missing timestamp expression before interval",
        ));
    }

    let (first, mut end) = parse_term(sql, kw, sign)?;
    let mut terms = vec![first];

    // chained terms: `- interval 2 second` directly after the previous unit
    loop {
        let next = skip_trivia(sql, end);
        let sign = match bytes.get(next) {
            Some(b'+') => Sign::Plus,
            Some(b'-') => Sign::Minus,
            _ => break,
        };
        let kw = skip_trivia(sql, next + 1);
        if !keyword_at(sql, kw, INTERVAL) {
            break;
        }
        let (term, term_end) = parse_term(sql, kw, sign)?;
        terms.push(term);
        end = term_end;
    }

    let mut span = base_start..end;
    if let Boundary::Group(open) = boundary {
        if let Some(group) = whole_group(sql, open, base_start, end) {
            span = group;
        }
    }

    Ok(IntervalExpr { base, terms, span })
}

/// Parse `interval <amount> <unit>` starting at the keyword, returning the term
/// and the index just past the unit word.
fn parse_term(sql: &str, kw: usize, sign: Sign) -> TranslateResult<(IntervalTerm<'_>, usize)> {
    let bytes = sql.as_bytes();
    let amount_start = kw + INTERVAL.len();
    let mut i = amount_start;

    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) || matches!(b, b'(' | b'[' | b'{') {
            let close = find_closing(sql, i).ok_or_else(|| {
                TranslateError::malformed(snippet(sql, kw, i + 1), "unbalanced interval amount")
            })?;
            i = close + 1;
            continue;
        }
        if let Some(next) = skip_comment(sql, i) {
            i = next;
            continue;
        }
        if matches!(b, b')' | b']' | b'}' | b',' | b';') {
            break;
        }
        let word_start =
            is_ident_byte(b) && (i == 0 || (!is_ident_byte(bytes[i - 1]) && bytes[i - 1] != b'.'));
        if !word_start {
            i += 1;
            continue;
        }

        let word_end = i + bytes[i..].iter().take_while(|&&b| is_ident_byte(b)).count();
        let word = &sql[i..word_end];
        // `hour(x)` is part of the amount, not its unit
        if bytes.get(skip_whitespace(sql, word_end)) == Some(&b'(') {
            i = word_end;
            continue;
        }
        if UNSUPPORTED_UNITS.iter().any(|u| word.eq_ignore_ascii_case(u)) {
            return Err(TranslateError::unsupported(
                &sql[kw..word_end],
                format!("interval unit {} has no SQLite date modifier", word.to_ascii_uppercase()),
            ));
        }
        if let Some(unit) = Unit::from_word(word) {
            let amount = sql[amount_start..i].trim();
            if amount.is_empty() {
                return Err(TranslateError::malformed(&sql[kw..word_end], "missing interval amount"));
            }
            check_nesting(amount, &sql[kw..word_end])?;
            return Ok((IntervalTerm { sign, amount, unit }, word_end));
        }
        i = word_end;
    }

    Err(TranslateError::malformed(
        snippet(sql, kw, i),
        "missing interval unit",
    ))
}

/// Reject amounts such as `(a - (b - c))`: one parenthesized level is fine, a
/// subtraction nested inside a second level is not supported.
fn check_nesting(amount: &str, fragment: &str) -> TranslateResult<()> {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    for b in amount.bytes() {
        match b {
            b'(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if max_depth > 1 && amount.contains('-') {
        return Err(TranslateError::unsupported(
            fragment,
            "nested parenthesized subtraction in an interval amount",
        ));
    }
    Ok(())
}

/// Scan backward from the sign to where the base expression's region begins.
fn base_boundary(sql: &str, regions: &[Range<usize>], sign_at: usize) -> TranslateResult<Boundary> {
    let bytes = sql.as_bytes();
    let mut i = sign_at;
    while i > 0 {
        i -= 1;
        if let Some(region) = region_at(regions, i) {
            i = region.start;
            continue;
        }
        match bytes[i] {
            b')' | b']' | b'}' | b'\'' | b'"' | b'`' => {
                i = find_opening(sql, i).ok_or_else(|| {
                    TranslateError::malformed(
                        snippet(sql, i, sign_at + 1),
                        "unbalanced timestamp expression before interval",
                    )
                })?;
            }
            b'(' | b'[' | b'{' => return Ok(Boundary::Group(i)),
            b',' | b'=' | b'<' | b'>' | b';' => return Ok(Boundary::Plain(i + 1)),
            _ => {}
        }
    }
    Ok(Boundary::Plain(0))
}

/// Move the start of `[from, to)` past the last top-level clause keyword in it.
fn cut_after_stop_words(sql: &str, from: usize, to: usize) -> usize {
    let bytes = sql.as_bytes();
    let mut start = from;
    let mut i = from;
    while i < to {
        let b = bytes[i];
        if is_quote(b) || matches!(b, b'(' | b'[' | b'{') {
            i = match find_closing(sql, i) {
                Some(close) if close < to => close + 1,
                _ => i + 1,
            };
            continue;
        }
        if let Some(next) = skip_comment(sql, i) {
            i = next;
            continue;
        }
        if let Some(word) = BASE_STOP_WORDS.iter().find(|w| keyword_at(sql, i, w)) {
            start = i + word.len();
            i = start;
            continue;
        }
        i += 1;
    }
    start
}

/// If the interval expression fills a bare grouping parenthesis, return the
/// span of the whole group so the parentheses are consumed too.
fn whole_group(sql: &str, open: usize, base_start: usize, end: usize) -> Option<Range<usize>> {
    let bytes = sql.as_bytes();
    if bytes[open] != b'(' || skip_trivia(sql, open + 1) != base_start {
        return None;
    }
    let close = skip_whitespace(sql, end);
    if find_closing(sql, open) != Some(close) {
        return None;
    }

    // a name before the group makes it an argument list: `f (...)`, `in (...)`
    let before = sql[..open].trim_end();
    if before.bytes().last().is_some_and(is_ident_byte) {
        let word_start = before
            .bytes()
            .rposition(|b| !is_ident_byte(b))
            .map_or(0, |p| p + 1);
        let word = &before[word_start..];
        let clause = BASE_STOP_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w));
        if !clause || word.eq_ignore_ascii_case("in") || word.eq_ignore_ascii_case("values") {
            return None;
        }
    }
    Some(open..close + 1)
}

fn skip_whitespace(sql: &str, mut i: usize) -> usize {
    let bytes = sql.as_bytes();
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Skip whitespace and comments.
fn skip_trivia(sql: &str, mut i: usize) -> usize {
    loop {
        i = skip_whitespace(sql, i);
        match skip_comment(sql, i) {
            Some(next) => i = next,
            None => return i,
        }
    }
}

/// End of `sql[start..end]` with trailing whitespace and comments removed.
fn trim_trivia_end(sql: &str, regions: &[Range<usize>], start: usize, mut end: usize) -> usize {
    loop {
        end = start + sql[start..end].trim_end().len();
        let comment = end
            .checked_sub(1)
            .and_then(|last| region_at(regions, last))
            .filter(|r| r.start >= start && skip_comment(sql, r.start).is_some());
        match comment {
            Some(r) => end = r.start,
            None => return end,
        }
    }
}
