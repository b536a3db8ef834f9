//! Statement execution seam.
//!
//! The pipeline never talks to a database itself; it hands compiled
//! statements to a [`StatementExecutor`].

use tracing::info;

use crate::error::MigrateResult;

pub trait StatementExecutor {
    /// Run the statements of one migration, in order.
    fn execute(&mut self, migration: &str, statements: &[String]) -> MigrateResult<()>;

    /// Run a pre/post check. An `Err` fails the migration.
    fn check(&mut self, migration: &str, query: &str) -> MigrateResult<()>;
}

/// Logs every statement and remembers what it ran.
#[derive(Debug, Default)]
pub struct LoggingExecutor {
    executed: Vec<(String, String)>,
}

impl LoggingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(migration, statement)` pairs, in execution order.
    pub fn executed(&self) -> &[(String, String)] {
        &self.executed
    }

    /// Statements run for one migration.
    pub fn statements_for(&self, migration: &str) -> Vec<&str> {
        self.executed
            .iter()
            .filter(|(m, _)| m == migration)
            .map(|(_, s)| s.as_str())
            .collect()
    }
}

impl StatementExecutor for LoggingExecutor {
    fn execute(&mut self, migration: &str, statements: &[String]) -> MigrateResult<()> {
        for stmt in statements {
            info!(migration, "{}", stmt);
            self.executed.push((migration.to_string(), stmt.clone()));
        }
        Ok(())
    }

    fn check(&mut self, migration: &str, query: &str) -> MigrateResult<()> {
        info!(migration, check = query, "check");
        Ok(())
    }
}
