//! MySQL → SQLite query translation.
//!
//! Text rewriting only, no SQL grammar. Each stage handles one construct and
//! the [`Translator`] runs them in a fixed order:
//!
//! | Stage                | MySQL                               | SQLite                                      |
//! |----------------------|-------------------------------------|---------------------------------------------|
//! | [`interval`]         | `t + interval 30 second`            | `datetime(t, '+' \|\| 30 \|\| ' seconds')`  |
//! | [`timediff`]         | `timestampdiff(SECOND, a, b)`       | `((julianday(b) - julianday(a)) * 86400)`   |
//! | [`functions`]        | `if(`, `std(`                       | `iif(`, `stdev(`                            |
//! | [`params`]           | `%s`                                | `?`                                         |
//! | [`schema`]           | `hte_data.exp_sfc`                  | `exp_sfc`                                   |
//! | [`comments`]         | `# note`                            | `/* note*/`                                 |
//!
//! Comments run last because earlier stages can move `#` characters around;
//! intervals and timestamp differences run before marker substitution.

pub mod comments;
pub mod functions;
pub mod interval;
pub mod params;
pub mod scanner;
pub mod schema;
pub mod timediff;
pub mod view;

use crate::config::{DEFAULT_SCHEMA, LabConfig};
use crate::error::{LabError, LabResult, TranslateResult};

pub use comments::translate_comments;
pub use functions::translate_function_names;
pub use interval::translate_intervals;
pub use params::translate_markers;
pub use scanner::find_closing;
pub use schema::strip_schema;
pub use timediff::translate_timestampdiff;
pub use view::{normalize_view_header, remove_redundant_brackets};

/// The MySQL → SQLite translation pipeline.
///
/// Holds no mutable state; one translator can be shared across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translator {
    schema_name: String,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA)
    }
}

impl Translator {
    /// Create a translator that strips `schema_name.` qualifiers.
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
        }
    }

    pub fn from_config(config: &LabConfig) -> Self {
        Self::new(config.schema_name.clone())
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Translate one MySQL statement to SQLite.
    ///
    /// Any stage failure aborts the whole translation; the error carries the
    /// untranslated statement.
    ///
    /// # Example
    ///
    /// ```
    /// use labsql::transpiler::Translator;
    ///
    /// let sql = Translator::new("hte_data")
    ///     .translate("select if(ok, 1, 0) from hte_data.runs where id = %s")
    ///     .unwrap();
    /// assert_eq!(sql, "select iif(ok, 1, 0) from runs where id = ?");
    /// ```
    pub fn translate(&self, query: &str) -> LabResult<String> {
        self.run(query)
            .map_err(|source| LabError::translation(query, source))
    }

    /// Translate a `CREATE VIEW` definition: header and join-nesting cleanups,
    /// then the regular pipeline.
    pub fn translate_view(&self, definition: &str) -> LabResult<String> {
        let normalized = remove_redundant_brackets(&normalize_view_header(definition));
        self.run(&normalized)
            .map_err(|source| LabError::translation(definition, source))
    }

    fn run(&self, query: &str) -> TranslateResult<String> {
        let sql = translate_intervals(query)?;
        let sql = translate_timestampdiff(&sql)?;
        let sql = translate_function_names(&sql);
        let sql = translate_markers(&sql);
        let sql = strip_schema(&sql, &self.schema_name);
        let sql = translate_comments(&sql);

        if sql != query {
            tracing::debug!(original = query, translated = %sql, "translated query");
        }
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_query_unchanged() {
        let sql = "select a, b from runs where a > 3 order by b";
        assert_eq!(Translator::default().translate(sql).unwrap(), sql);
    }

    #[test]
    fn test_full_pipeline() {
        let sql = "select r.id, (r.started + interval 30 second) as t1, # shifted start\n\
                   timestampdiff(SECOND, r.started, r.ended) as dt,\n\
                   if(r.ok, std(r.v), 0)\n\
                   from hte_data.runs r where r.id = %s";
        let expected = "select r.id, datetime(r.started, '+' || 30 || ' seconds') as t1, /* shifted start*/\n\
                        ((julianday(r.ended) - julianday(r.started)) * 86400) as dt,\n\
                        iif(r.ok, stdev(r.v), 0)\n\
                        from runs r where r.id = ?";
        assert_eq!(Translator::new("hte_data").translate(sql).unwrap(), expected);
    }

    #[test]
    fn test_failure_carries_query() {
        let sql = "select timestampdiff(MINUTE, a, b) from t";
        let err = Translator::default().translate(sql).unwrap_err();
        match err {
            LabError::Translation { query, source } => {
                assert_eq!(query, sql);
                assert_eq!(source.kind(), ErrorKind::UnsupportedConstruct);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_comments_never_translated() {
        let tr = Translator::default();
        assert_eq!(
            tr.translate("/* see issue #12 */ select t from hte_data.runs").unwrap(),
            "/* see issue #12 */ select t from runs"
        );
        assert_eq!(
            tr.translate("select t # add an interval later\nfrom runs").unwrap(),
            "select t /* add an interval later*/\nfrom runs"
        );
        assert_eq!(
            tr.translate("select t # timestampdiff(MINUTE, a, b) is not portable\nfrom runs").unwrap(),
            "select t /* timestampdiff(MINUTE, a, b) is not portable*/\nfrom runs"
        );
        let dashed = "select t -- shift by interval\nfrom runs";
        assert_eq!(tr.translate(dashed).unwrap(), dashed);
    }

    #[test]
    fn test_custom_schema() {
        let tr = Translator::new("lab2");
        assert_eq!(tr.translate("select * from lab2.t, hte_data.u").unwrap(), "select * from t, hte_data.u");
    }

    #[test]
    fn test_view_translation() {
        let view = "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `hte_data`.`v_ok` AS select `r`.`id` AS `id`,if(`r`.`ok`,1,0) AS `ok` from `hte_data`.`runs` `r`";
        assert_eq!(
            Translator::default().translate_view(view).unwrap(),
            "CREATE VIEW `v_ok` AS select `r`.`id` AS `id`,iif(`r`.`ok`,1,0) AS `ok` from `runs` `r`"
        );
    }
}
