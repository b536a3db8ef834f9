use crate::ast::{
    CreateFunction, CreateProcedure, CreateTrigger, DropObject, IsolationLevel, Rename,
    RenameColumn, TriggerEvent, TriggerTiming,
};
use crate::error::{MigrateError, MigrateResult};
use crate::transpiler::ddl::{drop_object, strip_terminator, type_key};
use crate::transpiler::traits::{SqlGenerator, quote_with};

/// MySQL Generator.
pub struct MysqlGenerator;

impl Default for MysqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MysqlGenerator {
    pub const fn new() -> Self {
        Self
    }

    fn reject_cascade(&self, drop: &DropObject, kind: &str) -> MigrateResult<()> {
        if drop.cascade {
            return Err(MigrateError::unsupported(
                self.name(),
                format!("DROP {} ... CASCADE", kind),
            ));
        }
        Ok(())
    }

    /// MySQL routines are always SQL; any other language is an error.
    fn reject_language(&self, language: Option<&str>) -> MigrateResult<()> {
        match language {
            Some(lang) if !lang.eq_ignore_ascii_case("sql") => Err(MigrateError::unsupported(
                self.name(),
                format!("routines in language '{}'", lang),
            )),
            _ => Ok(()),
        }
    }
}

impl SqlGenerator for MysqlGenerator {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '`')
    }

    fn map_data_type(&self, data_type: &str, size: Option<u32>, auto_increment: bool) -> String {
        let suffix = if auto_increment { " AUTO_INCREMENT" } else { "" };
        match type_key(data_type).as_str() {
            "string" => match size {
                Some(n) if n > 0 => format!("VARCHAR({})", n),
                _ => "TEXT".to_string(),
            },
            "text" => "TEXT".to_string(),
            "number" | "integer" | "int" => format!("INT{}", suffix),
            "bigint" => format!("BIGINT{}", suffix),
            "float" => "DOUBLE".to_string(),
            "decimal" => "DECIMAL".to_string(),
            "boolean" | "bool" => "TINYINT(1)".to_string(),
            "date" => "DATE".to_string(),
            "datetime" | "timestamp" => "DATETIME".to_string(),
            "time" => "TIME".to_string(),
            "json" => "JSON".to_string(),
            "uuid" => "CHAR(36)".to_string(),
            _ => data_type.to_string(),
        }
    }

    fn rename_table(&self, rename: &Rename) -> MigrateResult<Vec<String>> {
        Ok(vec![format!(
            "RENAME TABLE {} TO {};",
            self.quote_identifier(&rename.from),
            self.quote_identifier(&rename.to)
        )])
    }

    /// MySQL renames through `CHANGE`, which redeclares the column type.
    fn rename_column(&self, table: &str, rename: &RenameColumn) -> MigrateResult<Vec<String>> {
        let data_type = rename
            .data_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MigrateError::MissingColumnType {
                dialect: self.name(),
                table: table.to_string(),
                column: rename.from.clone(),
            })?;

        Ok(vec![format!(
            "ALTER TABLE {} CHANGE {} {} {};",
            self.quote_identifier(table),
            self.quote_identifier(&rename.from),
            self.quote_identifier(&rename.to),
            self.map_data_type(data_type, rename.size, false)
        )])
    }

    fn rename_view(&self, rename: &Rename) -> MigrateResult<Vec<String>> {
        self.rename_table(rename)
    }

    fn create_function(&self, function: &CreateFunction) -> MigrateResult<Vec<String>> {
        self.reject_language(function.language.as_deref())?;
        let mut stmts = Vec::new();
        if function.or_replace {
            stmts.push(drop_object(self, "FUNCTION", &function.name, false));
        }
        stmts.push(format!(
            "CREATE FUNCTION {}({}) RETURNS {} {};",
            self.quote_identifier(&function.name),
            function.params,
            function.returns,
            strip_terminator(&function.body)
        ));
        Ok(stmts)
    }

    fn drop_function(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        self.reject_cascade(drop, "FUNCTION")?;
        Ok(vec![drop_object(self, "FUNCTION", &drop.name, false)])
    }

    fn create_procedure(&self, procedure: &CreateProcedure) -> MigrateResult<Vec<String>> {
        self.reject_language(procedure.language.as_deref())?;
        let mut stmts = Vec::new();
        if procedure.or_replace {
            stmts.push(drop_object(self, "PROCEDURE", &procedure.name, false));
        }
        stmts.push(format!(
            "CREATE PROCEDURE {}({}) {};",
            self.quote_identifier(&procedure.name),
            procedure.params,
            strip_terminator(&procedure.body)
        ));
        Ok(stmts)
    }

    fn drop_procedure(&self, drop: &DropObject) -> MigrateResult<Vec<String>> {
        self.reject_cascade(drop, "PROCEDURE")?;
        Ok(vec![drop_object(self, "PROCEDURE", &drop.name, false)])
    }

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
        if trigger.timing == TriggerTiming::InsteadOf {
            return Err(MigrateError::unsupported(self.name(), "INSTEAD OF triggers"));
        }
        if !trigger.for_each_row {
            return Err(MigrateError::unsupported(self.name(), "statement-level triggers"));
        }

        let mut stmts = Vec::new();
        if trigger.or_replace {
            stmts.push(format!(
                "DROP TRIGGER IF EXISTS {};",
                self.quote_identifier(&trigger.name)
            ));
        }
        stmts.push(format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {};",
            self.quote_identifier(&trigger.name),
            trigger.timing.as_sql(),
            event.as_sql(),
            self.quote_identifier(&trigger.table),
            strip_terminator(&trigger.body)
        ));
        Ok(stmts)
    }

    fn foreign_key_enforcement(&self, enabled: bool) -> MigrateResult<String> {
        Ok(format!("SET FOREIGN_KEY_CHECKS = {};", u8::from(enabled)))
    }

    fn begin_transaction(&self) -> &'static str {
        "START TRANSACTION;"
    }

    /// The level applies to the next transaction, so it precedes the START.
    fn begin_transaction_with_isolation(&self, level: IsolationLevel) -> Vec<String> {
        vec![
            format!("SET TRANSACTION ISOLATION LEVEL {};", level.as_sql()),
            self.begin_transaction().to_string(),
        ]
    }
}
