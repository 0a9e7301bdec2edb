//! # labsql — laboratory SQL, networked or portable
//!
//! The laboratory database lives on a MySQL server; a SQLite copy is shipped
//! for offline use. labsql lets the same SQL run against both by rewriting
//! MySQL-only constructs into their SQLite equivalents.
//!
//! ## Quick Example
//!
//! ```rust
//! let sql = labsql::translate(
//!     "select (started_at + interval 30 second) from hte_data.runs where id = %s",
//! )?;
//! assert_eq!(
//!     sql,
//!     "select datetime(started_at, '+' || 30 || ' seconds') from runs where id = ?"
//! );
//! # Ok::<(), labsql::error::LabError>(())
//! ```
//!
//! ## Rewrites
//!
//! | MySQL                          | SQLite                                     |
//! |--------------------------------|--------------------------------------------|
//! | `t - interval 5 second`        | `datetime(t, '-' \|\| 5 \|\| ' seconds')`  |
//! | `timestampdiff(SECOND, a, b)`  | `((julianday(b) - julianday(a)) * 86400)`  |
//! | `if(c, a, b)`                  | `iif(c, a, b)`                             |
//! | `std(x)`                       | `stdev(x)` (registered aggregate)          |
//! | `%s`                           | `?`                                        |
//! | `hte_data.runs`                | `runs`                                     |
//! | `# comment`                    | `/* comment*/`                             |

pub mod config;
pub mod embedded;
pub mod engine;
pub mod error;
pub mod sqlite_functions;
pub mod transpiler;

pub mod prelude {
    pub use crate::config::LabConfig;
    pub use crate::embedded::EmbeddedDb;
    pub use crate::engine::{LabValue, NetworkDb, NetworkQuery};
    pub use crate::error::*;
    pub use crate::transpiler::Translator;
}

/// Translate a MySQL statement to SQLite with the default schema qualifier.
///
/// # Example
///
/// ```
/// use labsql::translate;
///
/// let sql = translate("select if(a, 1, 0) from hte_data.exp_sfc").unwrap();
/// assert_eq!(sql, "select iif(a, 1, 0) from exp_sfc");
/// ```
pub fn translate(query: &str) -> error::LabResult<String> {
    transpiler::Translator::default().translate(query)
}
