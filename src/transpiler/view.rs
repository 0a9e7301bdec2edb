//! Cleanups for `CREATE VIEW` definitions exported by MySQL.
//!
//! ```text
//! CREATE ALGORITHM=UNDEFINED DEFINER=`lab`@`%` SQL SECURITY DEFINER VIEW `v` AS select ...
//! ─┬──── ─────────────────────┬──────────────────────────────────── ─┬──
//!  │                          │                                      │
//!  │                          └── options (dropped)                  │
//!  └── kept ─────────────────────────────────────────────────────────┘
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_till1, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, value},
    multi::many0,
    sequence::{terminated, tuple},
    IResult,
};

use super::scanner::{find_keyword, skip_literal};

/// Runs of opening parentheses longer than this after `from` are treated as
/// tool-generated over-nesting.
pub const OVER_NESTING_THRESHOLD: usize = 10;

/// MySQL-only metadata between `CREATE` and `VIEW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOption<'a> {
    Algorithm(&'a str),
    Definer(&'a str),
    SqlSecurity(&'a str),
}

/// Parsed view header; `body` starts at the view name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewHeader<'a> {
    pub or_replace: bool,
    pub options: Vec<ViewOption<'a>>,
    pub body: &'a str,
}

/// Parse `CREATE [OR REPLACE] [options] VIEW `.
pub fn parse_view_header(input: &str) -> IResult<&str, ViewHeader<'_>> {
    let (input, _) = terminated(tag_no_case("create"), multispace1)(input)?;
    let (input, or_replace) = opt(tuple((
        tag_no_case("or"),
        multispace1,
        tag_no_case("replace"),
        multispace1,
    )))(input)?;
    let (input, options) = many0(terminated(parse_view_option, multispace1))(input)?;
    let (input, _) = terminated(tag_no_case("view"), multispace1)(input)?;

    Ok((
        "",
        ViewHeader {
            or_replace: or_replace.is_some(),
            options,
            body: input,
        },
    ))
}

fn parse_view_option(input: &str) -> IResult<&str, ViewOption<'_>> {
    alt((
        map(
            tuple((
                tag_no_case("algorithm"),
                multispace0,
                char('='),
                multispace0,
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            )),
            |(_, _, _, _, v)| ViewOption::Algorithm(v),
        ),
        map(
            tuple((
                tag_no_case("definer"),
                multispace0,
                char('='),
                multispace0,
                take_till1(|c: char| c.is_whitespace()),
            )),
            |(_, _, _, _, v)| ViewOption::Definer(v),
        ),
        map(
            tuple((
                tag_no_case("sql"),
                multispace1,
                tag_no_case("security"),
                multispace1,
                alt((
                    value("DEFINER", tag_no_case("definer")),
                    value("INVOKER", tag_no_case("invoker")),
                )),
            )),
            |(_, _, _, _, v)| ViewOption::SqlSecurity(v),
        ),
    ))(input)
}

/// Collapse a MySQL view header to a plain `CREATE VIEW`.
///
/// Text that does not start with a view header is returned unchanged.
pub fn normalize_view_header(sql: &str) -> String {
    let trimmed = sql.trim_start();
    match parse_view_header(trimmed) {
        Ok((_, header)) => {
            if !header.options.is_empty() || header.or_replace {
                tracing::debug!(options = ?header.options, or_replace = header.or_replace, "normalized view header");
            }
            format!("CREATE VIEW {}", header.body)
        }
        Err(_) => sql.to_string(),
    }
}

/// Undo tool-generated over-nesting of join clauses.
///
/// After each `from`, a run of more than [`OVER_NESTING_THRESHOLD`] opening
/// parentheses is removed together with the same number of top-level closing
/// parentheses that follow, one per subsequent join clause. When fewer closers
/// exist, only that many innermost openers are removed so every removal is
/// paired.
pub fn remove_redundant_brackets(sql: &str) -> String {
    let mut out = sql.to_string();
    let mut cursor = 0;
    while let Some(from) = find_keyword(&out, "from", cursor) {
        cursor = from + "from".len();
        if let Some(rewritten) = unnest_after(&out, cursor) {
            out = rewritten;
        }
    }
    out
}

fn unnest_after(sql: &str, start: usize) -> Option<String> {
    let bytes = sql.as_bytes();
    let mut openers = Vec::new();
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => openers.push(i),
            b if b.is_ascii_whitespace() => {}
            _ => break,
        }
        i += 1;
    }
    if openers.len() <= OVER_NESTING_THRESHOLD {
        return None;
    }

    let mut closers = Vec::new();
    let mut depth = 0usize;
    while i < bytes.len() && closers.len() < openers.len() {
        if let Some(next) = skip_literal(sql, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' if depth == 0 => closers.push(i),
            b')' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    if closers.len() < openers.len() {
        tracing::warn!(
            openers = openers.len(),
            closers = closers.len(),
            "over-nested from clause has fewer closing parentheses than expected"
        );
    }

    // the first top-level closer pairs with the innermost opener
    let mut removed: Vec<usize> = openers[openers.len() - closers.len()..].to_vec();
    removed.extend(&closers);
    let rewritten = sql
        .char_indices()
        .filter(|(idx, _)| !removed.contains(idx))
        .map(|(_, c)| c)
        .collect();
    Some(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mysql_header_normalized() {
        let sql = "CREATE ALGORITHM=UNDEFINED DEFINER=`lab`@`%` SQL SECURITY DEFINER VIEW `v_runs` AS select 1";
        assert_eq!(normalize_view_header(sql), "CREATE VIEW `v_runs` AS select 1");
    }

    #[test]
    fn test_header_options_parsed() {
        let (_, header) =
            parse_view_header("create or replace algorithm = merge sql security invoker view v as select 1").unwrap();
        assert!(header.or_replace);
        assert_eq!(
            header.options,
            vec![ViewOption::Algorithm("merge"), ViewOption::SqlSecurity("INVOKER")]
        );
        assert_eq!(header.body, "v as select 1");
    }

    #[test]
    fn test_plain_header_and_non_view() {
        assert_eq!(normalize_view_header("CREATE VIEW v AS select 1"), "CREATE VIEW v AS select 1");
        let sql = "select * from views";
        assert_eq!(normalize_view_header(sql), sql);
    }

    #[test]
    fn test_over_nested_joins() {
        let n = 11;
        let mut sql = format!("select * from {}t0", "(".repeat(n));
        for k in 1..=n {
            sql.push_str(&format!(" join t{k} on((t{k}.id = t0.id)))"));
        }
        sql.push_str(" where t0.x = 1");

        let mut expected = String::from("select * from t0");
        for k in 1..=n {
            expected.push_str(&format!(" join t{k} on((t{k}.id = t0.id))"));
        }
        expected.push_str(" where t0.x = 1");

        assert_eq!(remove_redundant_brackets(&sql), expected);
    }

    #[test]
    fn test_short_runs_untouched() {
        let sql = "select * from ((a join b on((a.id = b.id))) join c on((c.id = a.id)))";
        assert_eq!(remove_redundant_brackets(sql), sql);
    }

    #[test]
    fn test_missing_closers_stay_balanced() {
        let sql = format!("select * from {}t0 join t1 on(x)) join t2 on(y))", "(".repeat(12));
        let surplus = |s: &str| s.matches('(').count() - s.matches(')').count();
        let out = remove_redundant_brackets(&sql);
        assert_eq!(surplus(&out), surplus(&sql));
        assert!(out.starts_with(&format!("select * from {}t0", "(".repeat(10))));
    }
}
