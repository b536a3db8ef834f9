use crate::ast::{
    CreateEnum, CreateFunction, CreateProcedure, CreateTrigger, DropObject, DropRowPolicy,
    DropTrigger, IsolationLevel, Rename, RenameTrigger,
};
use crate::error::{MigrateError, MigrateResult};
use crate::transpiler::ddl::{alter_rename, drop_object, strip_terminator, type_key};
use crate::transpiler::traits::{SqlGenerator, quote_with};

/// PostgreSQL Generator. Supports every capability in the contract.
pub struct PostgresGenerator;

impl Default for PostgresGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresGenerator {
    pub const fn new() -> Self {
        Self
    }
}

const DEFAULT_LANGUAGE: &str = "plpgsql";

impl SqlGenerator for PostgresGenerator {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    fn map_data_type(&self, data_type: &str, size: Option<u32>, auto_increment: bool) -> String {
        match type_key(data_type).as_str() {
            "string" => match size {
                Some(n) if n > 0 => format!("VARCHAR({})", n),
                _ => "TEXT".to_string(),
            },
            "text" => "TEXT".to_string(),
            "number" | "integer" | "int" if auto_increment => "SERIAL".to_string(),
            "number" | "integer" | "int" => "INTEGER".to_string(),
            "bigint" if auto_increment => "BIGSERIAL".to_string(),
            "bigint" => "BIGINT".to_string(),
            "float" => "DOUBLE PRECISION".to_string(),
            "decimal" => "DECIMAL".to_string(),
            "boolean" | "bool" => "BOOLEAN".to_string(),
            "date" => "DATE".to_string(),
            "datetime" | "timestamp" => "TIMESTAMP".to_string(),
            "time" => "TIME".to_string(),
            "json" => "JSONB".to_string(),
            "uuid" => "UUID".to_string(),
            _ => data_type.to_string(),
        }
    }

    fn create_enum(&self, enum_type: &CreateEnum) -> MigrateResult<Vec<String>> {
        let values = enum_type
            .values
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(vec![format!(
            "CREATE TYPE {} AS ENUM ({});",
            self.quote_identifier(&enum_type.name),
            values
        )])
    }

    fn drop_enum(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        Ok(vec![drop_object(self, "TYPE", &drop.name, drop.cascade)])
    }

    fn drop_row_policy(&self, policy: &DropRowPolicy) -> MigrateResult<Vec<String>> {
        Ok(vec![format!(
            "DROP POLICY IF EXISTS {} ON {};",
            self.quote_identifier(&policy.name),
            self.quote_identifier(&policy.table)
        )])
    }

    fn drop_materialized_view(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        Ok(vec![drop_object(self, "MATERIALIZED VIEW", &drop.name, drop.cascade)])
    }

    fn drop_schema(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        Ok(vec![drop_object(self, "SCHEMA", &drop.name, drop.cascade)])
    }

    fn rename_view(&self, rename: &Rename) -> MigrateResult<Vec<String>> {
        Ok(vec![alter_rename(self, "VIEW", &rename.from, &rename.to)])
    }

    fn create_function(&self, function: &CreateFunction) -> MigrateResult<Vec<String>> {
        let or_replace = if function.or_replace { "OR REPLACE " } else { "" };
        let language = function.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
        Ok(vec![format!(
            "CREATE {}FUNCTION {}({}) RETURNS {} LANGUAGE {} AS $$ {} $$;",
            or_replace,
            self.quote_identifier(&function.name),
            function.params,
            function.returns,
            language,
            function.body.trim()
        )])
    }

    fn drop_function(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        Ok(vec![drop_object(self, "FUNCTION", &drop.name, drop.cascade)])
    }

    fn rename_function(&self, rename: &Rename) -> MigrateResult<Vec<String>> {
        Ok(vec![alter_rename(self, "FUNCTION", &rename.from, &rename.to)])
    }

    fn create_procedure(&self, procedure: &CreateProcedure) -> MigrateResult<Vec<String>> {
        let or_replace = if procedure.or_replace { "OR REPLACE " } else { "" };
        let language = procedure.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
        Ok(vec![format!(
            "CREATE {}PROCEDURE {}({}) LANGUAGE {} AS $$ {} $$;",
            or_replace,
            self.quote_identifier(&procedure.name),
            procedure.params,
            language,
            procedure.body.trim()
        )])
    }

    fn drop_procedure(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        Ok(vec![drop_object(self, "PROCEDURE", &drop.name, drop.cascade)])
    }

    fn rename_procedure(&self, rename: &Rename) -> MigrateResult<Vec<String>> {
        Ok(vec![alter_rename(self, "PROCEDURE", &rename.from, &rename.to)])
    }

    fn create_trigger(&self, trigger: &CreateTrigger) -> MigrateResult<Vec<String>> {
        if trigger.events.is_empty() {
            return Err(MigrateError::unsupported(self.name(), "triggers without events"));
        }
        let or_replace = if trigger.or_replace { "OR REPLACE " } else { "" };
        let events = trigger
            .events
            .iter()
            .map(|e| e.as_sql())
            .collect::<Vec<_>>()
            .join(" OR ");
        let scope = if trigger.for_each_row { "ROW" } else { "STATEMENT" };
        Ok(vec![format!(
            "CREATE {}TRIGGER {} {} {} ON {} FOR EACH {} {};",
            or_replace,
            self.quote_identifier(&trigger.name),
            trigger.timing.as_sql(),
            events,
            self.quote_identifier(&trigger.table),
            scope,
            strip_terminator(&trigger.body)
        )])
    }

    fn drop_trigger(&self, drop: &DropTrigger) -> MigrateResult<Vec<String>> {
        Ok(vec![format!(
            "DROP TRIGGER IF EXISTS {} ON {};",
            self.quote_identifier(&drop.name),
            self.quote_identifier(&drop.table)
        )])
    }

    fn rename_trigger(&self, rename: &RenameTrigger) -> MigrateResult<Vec<String>> {
        Ok(vec![format!(
            "ALTER TRIGGER {} ON {} RENAME TO {};",
            self.quote_identifier(&rename.from),
            self.quote_identifier(&rename.table),
            self.quote_identifier(&rename.to)
        )])
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN;"
    }

    fn begin_transaction_with_isolation(&self, level: IsolationLevel) -> Vec<String> {
        vec![format!("BEGIN TRANSACTION ISOLATION LEVEL {};", level.as_sql())]
    }
}
