//! Migration discovery, reading and file creation.
//!
//! A migration is a `<name>.toml` or `<name>.json` file in the migrations
//! directory; its name is the file stem. Names sort by their timestamp
//! prefix.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::ast::Migration;
use crate::error::{MigrateError, MigrateResult};
use crate::migrate::checksum::checksum;

const EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Raw migration source as read from disk.
#[derive(Debug, Clone)]
pub struct MigrationSource {
    pub name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl MigrationSource {
    pub fn checksum(&self) -> String {
        checksum(&self.bytes)
    }

    /// Deserialize by file extension. The name defaults to the file stem.
    pub fn parse(&self) -> MigrateResult<Migration> {
        let unmarshal = |message: String| MigrateError::Unmarshal {
            name: self.name.clone(),
            message,
        };
        let text = std::str::from_utf8(&self.bytes).map_err(|e| unmarshal(e.to_string()))?;
        let mut migration: Migration = match extension(&self.path) {
            Some("json") => serde_json::from_str(text).map_err(|e| unmarshal(e.to_string()))?,
            _ => toml::from_str(text).map_err(|e| unmarshal(e.to_string()))?,
        };
        if migration.name.is_empty() {
            migration.name = self.name.clone();
        }
        Ok(migration)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Names of all migrations in `dir`, sorted. A missing directory has none.
pub fn discover(dir: &Path) -> MigrateResult<Vec<String>> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "migrations directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in read {
        let path = entry?.path();
        if !path.is_file() || !extension(&path).is_some_and(|e| EXTENSIONS.contains(&e)) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}

/// Read the source of migration `name` from `dir`.
pub fn read_source(dir: &Path, name: &str) -> MigrateResult<MigrationSource> {
    for ext in EXTENSIONS {
        let path = dir.join(format!("{}.{}", name, ext));
        match fs::read(&path) {
            Ok(bytes) => {
                return Ok(MigrationSource {
                    name: name.to_string(),
                    path,
                    bytes,
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(MigrateError::MigrationNotFound(name.to_string()))
}

/// Migration names may only use ASCII letters, digits, `_` and `-`.
pub fn validate_name(name: &str) -> MigrateResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(MigrateError::InvalidMigrationName(name.to_string()))
    }
}

/// Write a new `<YYYYMMDDHHMMSS>_<name>.toml` template into `dir`.
pub fn create_migration_file(dir: &Path, name: &str, now: DateTime<Local>) -> MigrateResult<PathBuf> {
    validate_name(name)?;
    fs::create_dir_all(dir)?;

    let stem = format!("{}_{}", now.format("%Y%m%d%H%M%S"), name);
    let path = dir.join(format!("{}.toml", stem));
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(MigrateError::MigrationExists(stem));
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(template(&stem, now).as_bytes())?;

    info!(path = %path.display(), "created migration");
    Ok(path)
}

fn template(name: &str, now: DateTime<Local>) -> String {
    format!(
        r#"# Created {created}
name = "{name}"
version = "1.0.0"
description = ""

# [[up]]
# [[up.create_tables]]
# name = "users"
# primary_key = ["id"]
# columns = [
#   {{ name = "id", type = "number", auto_increment = true }},
#   {{ name = "email", type = "string", size = 255, nullable = false }},
# ]

# [[down]]
# drop_tables = [{{ name = "users" }}]
"#,
        created = now.to_rfc3339(),
        name = name,
    )
}
