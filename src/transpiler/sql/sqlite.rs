use tracing::debug;

use crate::ast::{
    Column, CreateTrigger, CreateView, DropObject, IsolationLevel, RenameColumn, TriggerEvent,
};
use crate::error::{MigrateError, MigrateResult};
use crate::transpiler::ddl::{self, strip_terminator, type_key};
use crate::transpiler::traits::{SqlGenerator, quote_with};

/// SQLite Generator.
///
/// SQLite has no DROP/RENAME COLUMN worth relying on and only accepts
/// foreign keys at table creation, so it asks the compiler to track table
/// shapes and recreate tables for those changes.
pub struct SqliteGenerator;

impl Default for SqliteGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteGenerator {
    pub const fn new() -> Self {
        Self
    }
}

impl SqlGenerator for SqliteGenerator {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    /// Auto-increment does not change the type: an `INTEGER` primary key
    /// already aliases the rowid.
    fn map_data_type(&self, data_type: &str, size: Option<u32>, _auto_increment: bool) -> String {
        match type_key(data_type).as_str() {
            "string" => match size {
                Some(n) if n > 0 => format!("VARCHAR({})", n),
                _ => "TEXT".to_string(),
            },
            "text" | "json" | "uuid" => "TEXT".to_string(),
            "number" | "integer" | "int" | "bigint" => "INTEGER".to_string(),
            "float" => "REAL".to_string(),
            "decimal" => "NUMERIC".to_string(),
            "boolean" | "bool" => "BOOLEAN".to_string(),
            "date" => "DATE".to_string(),
            "datetime" | "timestamp" => "DATETIME".to_string(),
            "time" => "TIME".to_string(),
            _ => data_type.to_string(),
        }
    }

    fn requires_schema_tracking(&self) -> bool {
        true
    }

    fn drop_table(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        if drop.cascade {
            return Err(MigrateError::unsupported(self.name(), "DROP TABLE ... CASCADE"));
        }
        Ok(vec![ddl::drop_table_if_exists(self, &drop.name, false)])
    }

    fn add_column(&self, table: &str, column: &Column) -> MigrateResult<Vec<String>> {
        if column.foreign_key.is_some() {
            return Err(MigrateError::unsupported(
                self.name(),
                format!(
                    "adding foreign key column '{}' to existing table '{}' (foreign keys are only valid at table creation)",
                    column.name, table
                ),
            ));
        }
        let mut stmts = vec![format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.quote_identifier(table),
            ddl::column_definition(self, column)
        )];
        stmts.extend(ddl::column_indexes(self, table, column));
        Ok(stmts)
    }

    fn drop_column(&self, table: &str, column: &str) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(
            self.name(),
            format!("DROP COLUMN '{}' on '{}' (table recreation required)", column, table),
        ))
    }

    fn rename_column(&self, table: &str, rename: &RenameColumn) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(
            self.name(),
            format!("RENAME COLUMN '{}' on '{}' (table recreation required)", rename.from, table),
        ))
    }

    fn create_view(&self, view: &CreateView) -> MigrateResult<Vec<String>> {
        let name = self.quote_identifier(&view.name);
        let mut stmts = Vec::new();
        if view.or_replace {
            stmts.push(format!("DROP VIEW IF EXISTS {};", name));
        }
        stmts.push(format!("CREATE VIEW {} AS {};", name, strip_terminator(&view.query)));
        Ok(stmts)
    }

    /// Create-or-replace is a single element holding both statements.
    fn create_trigger(&self, trigger: &CreateTrigger) -> MigrateResult<Vec<String>> {
        let event = match trigger.events.as_slice() {
            [event] => *event,
            _ => {
                return Err(MigrateError::unsupported(
                    self.name(),
                    "triggers with other than exactly one event",
                ));
            }
        };
        if event == TriggerEvent::Truncate {
            return Err(MigrateError::unsupported(self.name(), "TRUNCATE triggers"));
        }
        if !trigger.for_each_row {
            return Err(MigrateError::unsupported(self.name(), "statement-level triggers"));
        }

        let name = self.quote_identifier(&trigger.name);
        let create = format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {};",
            name,
            trigger.timing.as_sql(),
            event.as_sql(),
            self.quote_identifier(&trigger.table),
            strip_terminator(&trigger.body)
        );

        if trigger.or_replace {
            Ok(vec![format!("DROP TRIGGER IF EXISTS {}; {}", name, create)])
        } else {
            Ok(vec![create])
        }
    }

    fn foreign_key_enforcement(&self, enabled: bool) -> MigrateResult<String> {
        Ok(format!("PRAGMA foreign_keys = {};", if enabled { "ON" } else { "OFF" }))
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN TRANSACTION;"
    }

    fn begin_transaction_with_isolation(&self, _level: IsolationLevel) -> Vec<String> {
        vec![self.begin_transaction().to_string()]
    }

    /// SQLite transactions are always serializable; the level is ignored.
    fn wrap_in_transaction_with_isolation(
        &self,
        statements: &[String],
        level: IsolationLevel,
    ) -> Vec<String> {
        debug!(%level, "sqlite ignores transaction isolation level");
        self.wrap_in_transaction(statements)
    }
}
