//! Operation and migration compiler.
//!
//! Walks an [`Operation`] in a fixed kind order and asks the active
//! [`SqlGenerator`] for each change's statements. For engines that need it,
//! table alterations go through the [`SchemaTracker`] and are emulated by
//! recreating the table.

use tracing::debug;

use crate::ast::{
    AlterTable, CreateTable, Direction, Migration, Operation, Rename, TransactionConfig,
};
use crate::error::{MigrateError, MigrateResult};
use crate::snapshot::{self, Recreation, SchemaTracker};
use crate::transpiler::SqlGenerator;
use crate::transpiler::ddl;

/// Compiles operations for one engine against one snapshot tracker.
pub struct Compiler<'a> {
    generator: &'a dyn SqlGenerator,
    tracker: &'a SchemaTracker,
}

impl<'a> Compiler<'a> {
    pub fn new(generator: &'a dyn SqlGenerator, tracker: &'a SchemaTracker) -> Self {
        Self { generator, tracker }
    }

    fn tracking(&self) -> bool {
        self.generator.requires_schema_tracking()
    }

    /// Compile every change in `op`. Any failure aborts the whole operation.
    pub fn compile_operation(&self, op: &Operation) -> MigrateResult<Vec<String>> {
        let g = self.generator;
        let mut out = Vec::new();

        each(&mut out, &op.create_enums, "create enum", |e| &e.name, |e| g.create_enum(e))?;
        each(&mut out, &op.create_tables, "create table", |t| &t.name, |t| self.create_table(t))?;
        each(&mut out, &op.create_views, "create view", |v| &v.name, |v| g.create_view(v))?;
        each(&mut out, &op.create_functions, "create function", |f| &f.name, |f| {
            g.create_function(f)
        })?;
        each(&mut out, &op.create_procedures, "create procedure", |p| &p.name, |p| {
            g.create_procedure(p)
        })?;
        each(&mut out, &op.create_triggers, "create trigger", |t| &t.name, |t| {
            g.create_trigger(t)
        })?;
        each(&mut out, &op.alter_tables, "alter table", |a| &a.name, |a| self.alter_table(a))?;
        each(&mut out, &op.delete_data, "delete rows", |d| &d.table, |d| g.delete_data(d))?;
        each(&mut out, &op.drop_enums, "drop enum", |d| &d.name, |d| g.drop_enum(d))?;
        each(&mut out, &op.drop_row_policies, "drop row policy", |p| &p.name, |p| {
            g.drop_row_policy(p)
        })?;
        each(&mut out, &op.drop_materialized_views, "drop materialized view", |d| &d.name, |d| {
            g.drop_materialized_view(d)
        })?;
        each(&mut out, &op.drop_triggers, "drop trigger", |d| &d.name, |d| g.drop_trigger(d))?;
        each(&mut out, &op.drop_procedures, "drop procedure", |d| &d.name, |d| {
            g.drop_procedure(d)
        })?;
        each(&mut out, &op.drop_functions, "drop function", |d| &d.name, |d| {
            g.drop_function(d)
        })?;
        each(&mut out, &op.drop_views, "drop view", |d| &d.name, |d| g.drop_view(d))?;
        each(&mut out, &op.drop_tables, "drop table", |d| &d.name, |d| g.drop_table(d))?;
        each(&mut out, &op.drop_schemas, "drop schema", |d| &d.name, |d| g.drop_schema(d))?;
        each(&mut out, &op.rename_tables, "rename table", |r| &r.from, |r| self.rename_table(r))?;
        each(&mut out, &op.rename_views, "rename view", |r| &r.from, |r| g.rename_view(r))?;
        each(&mut out, &op.rename_functions, "rename function", |r| &r.from, |r| {
            g.rename_function(r)
        })?;
        each(&mut out, &op.rename_procedures, "rename procedure", |r| &r.from, |r| {
            g.rename_procedure(r)
        })?;
        each(&mut out, &op.rename_triggers, "rename trigger", |r| &r.from, |r| {
            g.rename_trigger(r)
        })?;

        debug!(dialect = g.name(), statements = out.len(), "compiled operation");
        Ok(out)
    }

    /// Concatenate the compiled operations of one direction, in order.
    pub fn compile_migration(
        &self,
        migration: &Migration,
        direction: Direction,
    ) -> MigrateResult<Vec<String>> {
        let mut out = Vec::new();
        for op in migration.operations(direction) {
            out.extend(self.compile_operation(op)?);
        }
        debug!(
            migration = %migration.name,
            %direction,
            statements = out.len(),
            "compiled migration"
        );
        Ok(out)
    }

    fn create_table(&self, table: &CreateTable) -> MigrateResult<Vec<String>> {
        let stmts = self.generator.create_table(table, true)?;
        if self.tracking() {
            self.tracker.register(table);
        }
        Ok(stmts)
    }

    fn rename_table(&self, rename: &Rename) -> MigrateResult<Vec<String>> {
        let stmts = self.generator.rename_table(rename)?;
        if self.tracking() {
            self.tracker.rename(&rename.from, &rename.to);
        }
        Ok(stmts)
    }

    fn alter_table(&self, alter: &AlterTable) -> MigrateResult<Vec<String>> {
        if !self.tracking() {
            return self.alter_in_place(alter);
        }
        if alter.is_destructive() {
            // Merged adds get no value from the copy step.
            if let Some(column) = alter
                .add_columns
                .iter()
                .find(|c| c.nullable == Some(false) && c.default.is_none())
            {
                return Err(MigrateError::unsupported(
                    self.generator.name(),
                    format!(
                        "adding NOT NULL column '{}' without a default while recreating '{}'",
                        column.name, alter.name
                    ),
                ));
            }
            self.tracker.alter(&alter.name, |current| {
                let plan = snapshot::plan_alteration(current, alter)?;
                let stmts = self.recreate(&plan)?;
                Ok((plan.schema, stmts))
            })
        } else {
            self.tracker.alter(&alter.name, |current| {
                let mut schema = current.clone();
                let mut stmts = Vec::new();
                for column in &alter.add_columns {
                    stmts.extend(
                        self.generator
                            .add_column(&alter.name, column)
                            .map_err(|e| e.context("add column", column.name.as_str()))?,
                    );
                    snapshot::append_column(&mut schema, column);
                }
                Ok((schema, stmts))
            })
        }
    }

    /// Native ALTER TABLE: adds, then drops, then renames.
    fn alter_in_place(&self, alter: &AlterTable) -> MigrateResult<Vec<String>> {
        let g = self.generator;
        let table = alter.name.as_str();
        let mut out = Vec::new();
        each(&mut out, &alter.add_columns, "add column", |c| &c.name, |c| {
            g.add_column(table, c)
        })?;
        each(&mut out, &alter.drop_columns, "drop column", |c| c, |c| {
            g.drop_column(table, c)
        })?;
        each(&mut out, &alter.rename_columns, "rename column", |r| &r.from, |r| {
            g.rename_column(table, r)
        })?;
        Ok(out)
    }

    /// The table recreation sequence that stands in for DROP/RENAME COLUMN.
    fn recreate(&self, plan: &Recreation) -> MigrateResult<Vec<String>> {
        let g = self.generator;
        let table = &plan.schema;
        if table.columns.is_empty() {
            return Err(MigrateError::unsupported(
                g.name(),
                format!("dropping every column of '{}'", table.name),
            ));
        }

        let backup = backup_name(&table.name);
        let mut stmts = vec![g.foreign_key_enforcement(false)?];
        stmts.extend(g.rename_table(&Rename::new(&table.name, &backup))?);
        stmts.push(ddl::create_table_definition(g, table));
        if !plan.copy_columns.is_empty() {
            stmts.push(format!(
                "INSERT INTO {} ({}) SELECT {} FROM {};",
                g.quote_identifier(&table.name),
                ddl::quote_list(g, &plan.target_columns()),
                ddl::quote_list(g, &plan.source_columns()),
                g.quote_identifier(&backup)
            ));
        }
        stmts.push(ddl::drop_table_if_exists(g, &backup, false));
        for column in &table.columns {
            stmts.extend(ddl::column_indexes(g, &table.name, column));
        }
        stmts.push(g.foreign_key_enforcement(true)?);

        debug!(table = %table.name, %backup, "recreating table");
        Ok(stmts)
    }
}

/// Compile each item in order, tagging failures with the sub-operation and
/// the object they concern.
fn each<'t, T>(
    out: &mut Vec<String>,
    items: &'t [T],
    operation: &'static str,
    target: impl Fn(&'t T) -> &'t String,
    compile: impl Fn(&'t T) -> MigrateResult<Vec<String>>,
) -> MigrateResult<()> {
    for item in items {
        let stmts = compile(item).map_err(|e| e.context(operation, target(item).as_str()))?;
        out.extend(stmts);
    }
    Ok(())
}

/// `_<table>_backup`, without any schema qualifier.
pub fn backup_name(table: &str) -> String {
    let base = table.rsplit('.').next().unwrap_or(table);
    format!("_{}_backup", base)
}

/// Wrap statements per the transaction config. Empty lists and disabled
/// transactions are returned as-is.
pub fn wrap_in_transaction(
    generator: &dyn SqlGenerator,
    statements: &[String],
    config: &TransactionConfig,
) -> Vec<String> {
    if !config.enabled || statements.is_empty() {
        return statements.to_vec();
    }
    match config.isolation_level {
        Some(level) => generator.wrap_in_transaction_with_isolation(statements, level),
        None => generator.wrap_in_transaction(statements),
    }
}

impl Migration {
    /// Compile the `up` or `down` side of this migration.
    pub fn compile(&self, direction: Direction, compiler: &Compiler<'_>) -> MigrateResult<Vec<String>> {
        compiler.compile_migration(self, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Column, CreateView, DeleteData, DropObject, IsolationLevel};
    use crate::transpiler::Dialect;
    use pretty_assertions::assert_eq;

    fn abc() -> CreateTable {
        CreateTable::new("t")
            .column(Column::new("a", "number"))
            .column(Column::new("b", "string"))
            .column(Column::new("c", "string"))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fixed_order() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::Postgres.generator(), &tracker);

        let mut op = Operation::new()
            .rename_table("old_logs", "logs")
            .drop_table("legacy")
            .delete(DeleteData::new("sessions"))
            .alter_table(AlterTable::new("users").drop_column("age"))
            .create_table(CreateTable::new("t").column(Column::new("a", "number")));
        op.create_views.push(CreateView {
            name: "v".to_string(),
            query: "SELECT 1".to_string(),
            or_replace: false,
        });

        assert_eq!(
            compiler.compile_operation(&op).unwrap(),
            strings(&[
                "CREATE TABLE \"t\" (\"a\" INTEGER);",
                "CREATE VIEW \"v\" AS SELECT 1;",
                "ALTER TABLE \"users\" DROP COLUMN \"age\";",
                "DELETE FROM \"sessions\";",
                "DROP TABLE IF EXISTS \"legacy\";",
                "ALTER TABLE \"old_logs\" RENAME TO \"logs\";",
            ])
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_failure_aborts_with_context() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        let mut op = Operation::new().create_table(abc());
        op.drop_schemas.push(DropObject::new("legacy"));

        let err = compiler.compile_operation(&op).unwrap_err();
        assert_eq!(err.to_string(), "drop schema 'legacy': sqlite does not support schemas");
        assert!(matches!(err.root_cause(), MigrateError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_sqlite_recreation() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        compiler
            .compile_operation(&Operation::new().create_table(abc()))
            .unwrap();

        let alter = AlterTable::new("t").rename_column("b", "b2").drop_column("c");
        let stmts = compiler
            .compile_operation(&Operation::new().alter_table(alter))
            .unwrap();

        assert_eq!(
            stmts,
            strings(&[
                "PRAGMA foreign_keys = OFF;",
                "ALTER TABLE \"t\" RENAME TO \"_t_backup\";",
                "CREATE TABLE \"t\" (\"a\" INTEGER, \"b2\" TEXT);",
                "INSERT INTO \"t\" (\"a\", \"b2\") SELECT \"a\", \"b\" FROM \"_t_backup\";",
                "DROP TABLE IF EXISTS \"_t_backup\";",
                "PRAGMA foreign_keys = ON;",
            ])
        );

        let names: Vec<_> = tracker
            .get("t")
            .unwrap()
            .columns
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a", "b2"]);
    }

    #[test]
    fn test_sqlite_recreation_restores_indexes_and_merges_adds() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        let table = CreateTable::new("t")
            .column(Column::new("a", "number"))
            .column(Column::new("b", "string").unique());
        compiler
            .compile_operation(&Operation::new().create_table(table))
            .unwrap();

        let alter = AlterTable::new("t")
            .drop_column("a")
            .add_column(Column::new("d", "boolean").default_value(false));
        let stmts = compiler
            .compile_operation(&Operation::new().alter_table(alter))
            .unwrap();

        assert_eq!(stmts[2], "CREATE TABLE \"t\" (\"b\" TEXT, \"d\" BOOLEAN DEFAULT false);");
        assert_eq!(stmts[3], "INSERT INTO \"t\" (\"b\") SELECT \"b\" FROM \"_t_backup\";");
        assert_eq!(stmts[5], "CREATE UNIQUE INDEX \"t_b_key\" ON \"t\" (\"b\");");
    }

    #[test]
    fn test_sqlite_recreation_rejects_required_add_without_default() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        compiler
            .compile_operation(&Operation::new().create_table(abc()))
            .unwrap();

        let alter = AlterTable::new("t")
            .drop_column("c")
            .add_column(Column::new("d", "string").not_null());
        let err = compiler
            .compile_operation(&Operation::new().alter_table(alter))
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            MigrateError::UnsupportedOperation { dialect: "sqlite", .. }
        ));
        assert_eq!(tracker.get("t"), Some(abc()));
    }

    #[test]
    fn test_sqlite_add_only_alteration() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        compiler
            .compile_operation(&Operation::new().create_table(abc()))
            .unwrap();

        let alter = AlterTable::new("t").add_column(Column::new("d", "string").size(20));
        let stmts = compiler
            .compile_operation(&Operation::new().alter_table(alter))
            .unwrap();
        assert_eq!(stmts, strings(&["ALTER TABLE \"t\" ADD COLUMN \"d\" VARCHAR(20);"]));
        assert_eq!(tracker.get("t").unwrap().columns.len(), 4);
    }

    #[test]
    fn test_sqlite_untracked_alteration() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        let alter = AlterTable::new("ghost").drop_column("x");
        let err = compiler
            .compile_operation(&Operation::new().alter_table(alter))
            .unwrap_err();
        assert!(matches!(err.root_cause(), MigrateError::SchemaNotFound(t) if t == "ghost"));
    }

    #[test]
    fn test_sqlite_rename_table_moves_snapshot() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        let op = Operation::new().create_table(abc()).rename_table("t", "u");
        compiler.compile_operation(&op).unwrap();
        assert!(tracker.contains("u"));
        assert!(!tracker.contains("t"));
    }

    #[test]
    fn test_failed_alteration_keeps_snapshot() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::SQLite.generator(), &tracker);
        compiler
            .compile_operation(&Operation::new().create_table(abc()))
            .unwrap();

        let alter = AlterTable::new("t").drop_column("c").drop_column("missing");
        let err = compiler
            .compile_operation(&Operation::new().alter_table(alter))
            .unwrap_err();
        assert!(matches!(err.root_cause(), MigrateError::ColumnNotFound { .. }));
        assert_eq!(tracker.get("t"), Some(abc()));
    }

    #[test]
    fn test_migration_compile_directions() {
        let tracker = SchemaTracker::new();
        let compiler = Compiler::new(Dialect::MySQL.generator(), &tracker);
        let migration = Migration::new("20240101000000_users")
            .up(Operation::new().create_table(CreateTable::new("users").column(Column::new("id", "number"))))
            .up(Operation::new().delete(DeleteData::new("users")))
            .down(Operation::new().drop_table("users"));

        assert_eq!(
            migration.compile(Direction::Up, &compiler).unwrap(),
            strings(&["CREATE TABLE `users` (`id` INT);", "DELETE FROM `users`;"])
        );
        assert_eq!(
            migration.compile(Direction::Down, &compiler).unwrap(),
            strings(&["DROP TABLE IF EXISTS `users`;"])
        );
    }

    #[test]
    fn test_wrap_in_transaction_config() {
        let g = Dialect::MySQL.generator();
        let stmts = strings(&["X;"]);

        assert_eq!(
            wrap_in_transaction(g, &stmts, &TransactionConfig::default()),
            strings(&["START TRANSACTION;", "X;", "COMMIT;"])
        );
        assert_eq!(wrap_in_transaction(g, &stmts, &TransactionConfig::disabled()), stmts);
        assert!(wrap_in_transaction(g, &[], &TransactionConfig::default()).is_empty());
        assert_eq!(
            wrap_in_transaction(
                Dialect::Postgres.generator(),
                &stmts,
                &TransactionConfig::with_isolation(IsolationLevel::Serializable)
            ),
            strings(&["BEGIN TRANSACTION ISOLATION LEVEL SERIALIZABLE;", "X;", "COMMIT;"])
        );
    }

    #[test]
    fn test_backup_name() {
        assert_eq!(backup_name("t"), "_t_backup");
        assert_eq!(backup_name("main.t"), "_t_backup");
    }
}
