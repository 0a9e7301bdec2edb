//! Embedded (SQLite) database access.
//!
//! Every statement handed to [`EmbeddedDb`] is written in the networked
//! dialect and passes through the [`Translator`] first, so callers can use
//! the same SQL against either backend.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use crate::config::LabConfig;
use crate::engine::LabValue;
use crate::error::{LabError, LabResult};
use crate::sqlite_functions::register_functions;
use crate::transpiler::Translator;

/// A portable copy of the laboratory database.
pub struct EmbeddedDb {
    conn: Connection,
    translator: Translator,
}

impl EmbeddedDb {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, translator: Translator) -> LabResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| LabError::Connection(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "opened embedded database");
        Self::with_connection(conn, translator)
    }

    pub fn open_in_memory(translator: Translator) -> LabResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| LabError::Connection(e.to_string()))?;
        Self::with_connection(conn, translator)
    }

    /// Open the database named by the configuration.
    pub fn from_config(config: &LabConfig) -> LabResult<Self> {
        Self::open(&config.embedded_db_path, Translator::from_config(config))
    }

    fn with_connection(conn: Connection, translator: Translator) -> LabResult<Self> {
        register_functions(&conn)?;
        Ok(Self { conn, translator })
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// The raw SQLite connection; statements run here are not translated.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Translate and run a query, returning every row.
    pub fn query(
        &self,
        sql: &str,
        params: &[LabValue],
    ) -> LabResult<Vec<HashMap<String, serde_json::Value>>> {
        let translated = self.translator.translate(sql)?;
        let mut stmt = self
            .conn
            .prepare(&translated)
            .map_err(|e| LabError::Execution(format!("{}: {}", e, translated)))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| LabError::Execution(e.to_string()))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = HashMap::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                map.insert(name.clone(), value_to_json(row.get_ref(i)?));
            }
            results.push(map);
        }
        Ok(results)
    }

    /// Translate and run a query that must return at least one row.
    pub fn query_one(
        &self,
        sql: &str,
        params: &[LabValue],
    ) -> LabResult<HashMap<String, serde_json::Value>> {
        self.query(sql, params)?
            .into_iter()
            .next()
            .ok_or_else(|| LabError::Execution("Query returned no rows".to_string()))
    }

    /// Translate and run a statement; returns the number of affected rows.
    pub fn execute(&self, sql: &str, params: &[LabValue]) -> LabResult<usize> {
        let translated = self.translator.translate(sql)?;
        self.conn
            .execute(&translated, params_from_iter(params.iter()))
            .map_err(|e| LabError::Execution(format!("{}: {}", e, translated)))
    }

    /// Translate a statement and let SQLite compile it without running it.
    ///
    /// Returns the translated text on success.
    pub fn verify(&self, sql: &str) -> LabResult<String> {
        let translated = self.translator.translate(sql)?;
        self.conn
            .prepare(&translated)
            .map_err(|e| LabError::Execution(format!("{}: {}", e, translated)))?;
        Ok(translated)
    }

    /// Port a MySQL `CREATE VIEW` definition and create the view.
    pub fn create_view(&self, definition: &str) -> LabResult<String> {
        let translated = self.translator.translate_view(definition)?;
        self.conn
            .execute_batch(&translated)
            .map_err(|e| LabError::Execution(format!("{}: {}", e, translated)))?;
        Ok(translated)
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            serde_json::Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}
