//! labsql configuration.
//!
//! Looked up in this order:
//!
//! 1. `labsql.toml` in the working directory
//! 2. `<config dir>/labsql/config.toml` (e.g. `~/.config/labsql/config.toml`)
//! 3. built-in defaults
//!
//! ```toml
//! schema_name = "hte_data"
//! database_url = "mysql://lab@db.example/hte_data"
//! embedded_db_path = "hte.sqlite"
//! reports_dir = "reports"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LabError, LabResult};

/// Schema qualifier stripped when no configuration says otherwise.
pub const DEFAULT_SCHEMA: &str = "hte_data";

const LOCAL_CONFIG: &str = "labsql.toml";

/// Main labsql configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Schema qualifier to strip when porting queries
    pub schema_name: String,

    /// Networked (MySQL) database URL
    pub database_url: Option<String>,

    /// Location of the embedded (SQLite) database
    pub embedded_db_path: PathBuf,

    /// Where verification reports are written
    pub reports_dir: PathBuf,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            schema_name: DEFAULT_SCHEMA.to_string(),
            database_url: None,
            embedded_db_path: PathBuf::from("hte.sqlite"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl LabConfig {
    /// Create a new configuration builder
    pub fn builder() -> LabConfigBuilder {
        LabConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> LabResult<Self> {
        toml::from_str(content).map_err(|e| LabError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> LabResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LabError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load the first configuration file found, or fall back to defaults.
    pub fn discover() -> LabResult<Self> {
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            return Self::load(local);
        }
        if let Some(user) = dirs::config_dir().map(|d| d.join("labsql").join("config.toml")) {
            if user.exists() {
                return Self::load(user);
            }
        }
        Ok(Self::default())
    }
}

/// Builder for LabConfig
#[derive(Debug, Default)]
pub struct LabConfigBuilder {
    config: LabConfig,
}

impl LabConfigBuilder {
    /// Set the schema qualifier to strip
    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.config.schema_name = name.into();
        self
    }

    /// Set the networked database URL
    pub fn database(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    /// Set the embedded database path
    pub fn embedded_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.embedded_db_path = path.into();
        self
    }

    /// Set the reports directory
    pub fn reports_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.reports_dir = path.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> LabConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LabConfig::default();
        assert_eq!(config.schema_name, "hte_data");
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LabConfig::from_toml_str("schema_name = \"lab2\"\nreports_dir = \"/tmp/r\"").unwrap();
        assert_eq!(config.schema_name, "lab2");
        assert_eq!(config.reports_dir, PathBuf::from("/tmp/r"));
        assert_eq!(config.embedded_db_path, PathBuf::from("hte.sqlite"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = LabConfig::from_toml_str("schema = \"x\"").unwrap_err();
        assert!(matches!(err, LabError::Config(_)));
    }

    #[test]
    fn test_builder() {
        let config = LabConfig::builder()
            .schema("lab")
            .database("mysql://localhost/lab")
            .embedded_db("lab.sqlite")
            .build();
        assert_eq!(config.schema_name, "lab");
        assert_eq!(config.database_url.as_deref(), Some("mysql://localhost/lab"));
        assert_eq!(config.embedded_db_path, PathBuf::from("lab.sqlite"));
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
    }
}
