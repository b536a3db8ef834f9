//! Runtime configuration.
//!
//! Loaded from TOML, looked up in order: an explicit path, `./dbshift.toml`,
//! `<config dir>/dbshift/config.toml`, then built-in defaults.
//!
//! ```toml
//! driver = "sqlite"
//! migrations_dir = "db/migrations"
//! timeout_secs = 30
//!
//! [transaction]
//! isolation_level = "serializable"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::TransactionConfig;
use crate::error::{MigrateError, MigrateResult};
use crate::transpiler::Dialect;

pub const CONFIG_FILE: &str = "dbshift.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Engine name or alias; unknown names fall back to Postgres.
    pub driver: String,
    pub migrations_dir: PathBuf,
    pub history_file: PathBuf,
    pub lock_file: PathBuf,
    /// Deadline for one `apply` run over pending migrations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Default envelope; a migration's own `transaction` table wins.
    pub transaction: TransactionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: "postgres".to_string(),
            migrations_dir: PathBuf::from("migrations"),
            history_file: PathBuf::from(".dbshift_history"),
            lock_file: PathBuf::from(".dbshift.lock"),
            timeout_secs: None,
            transaction: TransactionConfig::default(),
        }
    }
}

impl Config {
    /// Defaults with every path placed under `root`.
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            migrations_dir: root.join(defaults.migrations_dir),
            history_file: root.join(defaults.history_file),
            lock_file: root.join(defaults.lock_file),
            ..Self::default()
        }
    }

    pub fn driver(mut self, driver: &str) -> Self {
        self.driver = driver.to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn parse(content: &str) -> MigrateResult<Self> {
        toml::from_str(content).map_err(|e| MigrateError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> MigrateResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Resolve the configuration using the lookup order above.
    pub fn load(explicit: Option<&Path>) -> MigrateResult<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading config");
            return Self::from_file(path);
        }
        for candidate in Self::search_paths() {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "loading config");
                return Self::from_file(&candidate);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("dbshift").join("config.toml"));
        }
        paths
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::from_name(&self.driver)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IsolationLevel;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dialect(), Dialect::Postgres);
        assert!(config.transaction.enabled);
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
driver = "sqlite3"
migrations_dir = "db/migrations"
history_file = "db/history"
timeout_secs = 30

[transaction]
isolation_level = "serializable"
"#,
        )
        .unwrap();
        assert_eq!(config.dialect(), Dialect::SQLite);
        assert_eq!(config.migrations_dir, PathBuf::from("db/migrations"));
        assert_eq!(config.lock_file, PathBuf::from(".dbshift.lock"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.transaction,
            TransactionConfig::with_isolation(IsolationLevel::Serializable)
        );
    }

    #[test]
    fn test_unknown_driver_falls_back() {
        let config = Config::default().driver("cockroach");
        assert_eq!(config.dialect(), Dialect::Postgres);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = Config::parse("drivr = \"mysql\"").unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_isolation_level() {
        let err = Config::parse("[transaction]\nisolation_level = \"chaos\"").unwrap_err();
        assert!(err.to_string().contains("chaos"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "driver = \"mysql\"\n").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().dialect(), Dialect::MySQL);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_in_dir() {
        let config = Config::in_dir("/tmp/project");
        assert_eq!(config.migrations_dir, PathBuf::from("/tmp/project/migrations"));
        assert_eq!(config.history_file, PathBuf::from("/tmp/project/.dbshift_history"));
    }
}
