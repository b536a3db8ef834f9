//! Dialect contract and identifier helpers.

use crate::ast::{
    Column, CreateEnum, CreateFunction, CreateProcedure, CreateTable, CreateTrigger, CreateView,
    DeleteData, DropObject, DropRowPolicy, DropTrigger, IsolationLevel, Rename, RenameColumn,
    RenameTrigger,
};
use crate::error::{MigrateError, MigrateResult};
use crate::transpiler::ddl;

/// Quote an identifier with the given quote character.
/// Dotted identifiers (e.g. `schema.table`) are quoted part by part.
pub fn quote_with(name: &str, quote: char) -> String {
    name.split('.')
        .map(|part| {
            let escaped = part.replace(quote, &format!("{}{}", quote, quote));
            format!("{}{}{}", quote, escaped, quote)
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Trait for dialect-specific DDL generation.
///
/// Every method returns complete statements, one per element, each
/// terminated with `;`. Default implementations produce the forms shared by
/// the supported engines; capabilities not every engine has default to
/// [`MigrateError::UnsupportedOperation`] and are overridden where they exist.
pub trait SqlGenerator: Send + Sync {
    /// Engine name, used in error messages.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, or object name).
    fn quote_identifier(&self, name: &str) -> String;

    /// Map a generic type tag to the native column type.
    /// Unknown tags are returned unchanged.
    fn map_data_type(&self, data_type: &str, size: Option<u32>, auto_increment: bool) -> String;

    /// Engines without DROP/RENAME COLUMN need the compiler to track table
    /// shapes so it can recreate tables instead.
    fn requires_schema_tracking(&self) -> bool {
        false
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// CREATE TABLE plus its column indexes, or the matching DROP when `up`
    /// is false.
    fn create_table(&self, table: &CreateTable, up: bool) -> MigrateResult<Vec<String>> {
        if !up {
            return Ok(vec![ddl::drop_table_if_exists(self, &table.name, false)]);
        }
        let mut stmts = vec![ddl::create_table_definition(self, table)];
        for column in &table.columns {
            stmts.extend(ddl::column_indexes(self, &table.name, column));
        }
        Ok(stmts)
    }

    fn drop_table(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        Ok(vec![ddl::drop_table_if_exists(self, &drop.name, drop.cascade)])
    }

    fn rename_table(&self, rename: &Rename) -> MigrateResult<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} RENAME TO {};",
            self.quote_identifier(&rename.from),
            self.quote_identifier(&rename.to)
        )])
    }

    /// ADD COLUMN, then unique index, plain index and foreign key, in that order.
    fn add_column(&self, table: &str, column: &Column) -> MigrateResult<Vec<String>> {
        let mut stmts = vec![format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.quote_identifier(table),
            ddl::column_definition(self, column)
        )];
        stmts.extend(ddl::column_indexes(self, table, column));
        if let Some(fk) = &column.foreign_key {
            stmts.push(ddl::add_foreign_key(self, table, &column.name, fk));
        }
        Ok(stmts)
    }

    fn drop_column(&self, table: &str, column: &str) -> MigrateResult<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP COLUMN {};",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )])
    }

    fn rename_column(&self, table: &str, rename: &RenameColumn) -> MigrateResult<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};",
            self.quote_identifier(table),
            self.quote_identifier(&rename.from),
            self.quote_identifier(&rename.to)
        )])
    }

    fn delete_data(&self, delete: &DeleteData) -> MigrateResult<Vec<String>> {
        let table = self.quote_identifier(&delete.table);
        let stmt = match delete.condition.as_deref().map(ddl::strip_terminator) {
            Some(cond) if !cond.is_empty() => format!("DELETE FROM {} WHERE {};", table, cond),
            _ => format!("DELETE FROM {};", table),
        };
        Ok(vec![stmt])
    }

    // ------------------------------------------------------------------
    // Types, policies, schemas
    // ------------------------------------------------------------------

    fn create_enum(&self, _enum_type: &CreateEnum) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "enum types"))
    }

    fn drop_enum(&self, _drop: &DropObject) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "enum types"))
    }

    fn drop_row_policy(&self, _policy: &DropRowPolicy) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "row level security policies"))
    }

    fn drop_materialized_view(&self, _drop: &DropObject) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "materialized views"))
    }

    fn drop_schema(&self, _drop: &DropObject) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "schemas"))
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    fn create_view(&self, view: &CreateView) -> MigrateResult<Vec<String>> {
        let or_replace = if view.or_replace { "OR REPLACE " } else { "" };
        Ok(vec![format!(
            "CREATE {}VIEW {} AS {};",
            or_replace,
            self.quote_identifier(&view.name),
            ddl::strip_terminator(&view.query)
        )])
    }

    fn drop_view(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        Ok(vec![format!("DROP VIEW IF EXISTS {};", self.quote_identifier(&drop.name))])
    }

    fn rename_view(&self, _rename: &Rename) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "renaming views"))
    }

    // ------------------------------------------------------------------
    // Functions and procedures
    // ------------------------------------------------------------------

    fn create_function(&self, _function: &CreateFunction) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "stored functions"))
    }

    fn drop_function(&self, _drop: &DropObject) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "stored functions"))
    }

    fn rename_function(&self, _rename: &Rename) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "renaming functions"))
    }

    fn create_procedure(&self, _procedure: &CreateProcedure) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "stored procedures"))
    }

    fn drop_procedure(&self, _drop: &DropObject) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "stored procedures"))
    }

    fn rename_procedure(&self, _rename: &Rename) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "renaming procedures"))
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    fn create_trigger(&self, _trigger: &CreateTrigger) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "triggers"))
    }

    fn drop_trigger(&self, drop: &DropTrigger) -> MigrateResult<Vec<String>> {
        Ok(vec![format!("DROP TRIGGER IF EXISTS {};", self.quote_identifier(&drop.name))])
    }

    fn rename_trigger(&self, _rename: &RenameTrigger) -> MigrateResult<Vec<String>> {
        Err(MigrateError::unsupported(self.name(), "renaming triggers"))
    }

    // ------------------------------------------------------------------
    // Session and transactions
    // ------------------------------------------------------------------

    /// Statement toggling foreign key enforcement for the session.
    fn foreign_key_enforcement(&self, _enabled: bool) -> MigrateResult<String> {
        Err(MigrateError::unsupported(self.name(), "toggling foreign key enforcement"))
    }

    /// The statement that opens a transaction, e.g. `BEGIN;`.
    fn begin_transaction(&self) -> &'static str;

    /// Statements that open a transaction at the given isolation level.
    fn begin_transaction_with_isolation(&self, level: IsolationLevel) -> Vec<String>;

    /// `<begin>; <statements...>; COMMIT;`
    fn wrap_in_transaction(&self, statements: &[String]) -> Vec<String> {
        let mut wrapped = Vec::with_capacity(statements.len() + 2);
        wrapped.push(self.begin_transaction().to_string());
        wrapped.extend(statements.iter().cloned());
        wrapped.push("COMMIT;".to_string());
        wrapped
    }

    fn wrap_in_transaction_with_isolation(
        &self,
        statements: &[String],
        level: IsolationLevel,
    ) -> Vec<String> {
        let mut wrapped = self.begin_transaction_with_isolation(level);
        wrapped.extend(statements.iter().cloned());
        wrapped.push("COMMIT;".to_string());
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_with() {
        assert_eq!(quote_with("users", '"'), "\"users\"");
        assert_eq!(quote_with("auth.users", '"'), "\"auth\".\"users\"");
        assert_eq!(quote_with("we\"ird", '"'), "\"we\"\"ird\"");
        assert_eq!(quote_with("order", '`'), "`order`");
    }
}
