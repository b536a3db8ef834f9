use tracing::warn;

use crate::transpiler::sql::mysql::MysqlGenerator;
use crate::transpiler::sql::postgres::PostgresGenerator;
use crate::transpiler::sql::sqlite::SqliteGenerator;
use crate::transpiler::traits::SqlGenerator;

static POSTGRES: PostgresGenerator = PostgresGenerator::new();
static MYSQL: MysqlGenerator = MysqlGenerator::new();
static SQLITE: SqliteGenerator = SqliteGenerator::new();

/// Supported SQL Dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    MySQL,
    SQLite,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Postgres, Dialect::MySQL, Dialect::SQLite];

    /// The shared generator for this dialect.
    pub fn generator(&self) -> &'static dyn SqlGenerator {
        match self {
            Dialect::Postgres => &POSTGRES,
            Dialect::MySQL => &MYSQL,
            Dialect::SQLite => &SQLITE,
        }
    }

    /// Canonical driver name.
    pub fn name(&self) -> &'static str {
        self.generator().name()
    }

    /// Resolve a driver name or one of its aliases, case-insensitively.
    pub fn lookup(name: &str) -> Option<Dialect> {
        match name.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySQL),
            "sqlite" | "sqlite3" => Some(Dialect::SQLite),
            _ => None,
        }
    }

    /// Like [`Dialect::lookup`], but unknown names fall back to Postgres.
    pub fn from_name(name: &str) -> Dialect {
        Self::lookup(name).unwrap_or_else(|| {
            warn!(driver = name, "unknown driver, falling back to postgres");
            Dialect::Postgres
        })
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
