//! Migration and operation batches.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::{
    AlterTable, CreateEnum, CreateFunction, CreateProcedure, CreateTable, CreateTrigger,
    CreateView, DeleteData, DropObject, DropRowPolicy, DropTrigger, Rename, RenameTrigger,
};

/// One migration file, deserialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Migration {
    /// Filled from the file stem when left empty.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub up: Vec<Operation>,
    #[serde(default)]
    pub down: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionConfig>,
    /// SQL checks run before the body; a failing check aborts the migration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_checks: Vec<String>,
    /// SQL checks run after the body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_checks: Vec<String>,
}

impl Migration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn up(mut self, op: Operation) -> Self {
        self.up.push(op);
        self
    }

    pub fn down(mut self, op: Operation) -> Self {
        self.down.push(op);
        self
    }

    pub fn operations(&self, direction: Direction) -> &[Operation] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// Which side of a migration to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A batch of changes. Each list may be empty; the compiler emits the
/// kinds in a fixed order regardless of how they were declared.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create_enums: Vec<CreateEnum>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create_tables: Vec<CreateTable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create_views: Vec<CreateView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create_functions: Vec<CreateFunction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create_procedures: Vec<CreateProcedure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create_triggers: Vec<CreateTrigger>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alter_tables: Vec<AlterTable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete_data: Vec<DeleteData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_enums: Vec<DropObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_row_policies: Vec<DropRowPolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_materialized_views: Vec<DropObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_triggers: Vec<DropTrigger>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_procedures: Vec<DropObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_functions: Vec<DropObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_views: Vec<DropObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_tables: Vec<DropObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_schemas: Vec<DropObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rename_tables: Vec<Rename>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rename_views: Vec<Rename>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rename_functions: Vec<Rename>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rename_procedures: Vec<Rename>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rename_triggers: Vec<RenameTrigger>,
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(mut self, table: CreateTable) -> Self {
        self.create_tables.push(table);
        self
    }

    pub fn alter_table(mut self, alter: AlterTable) -> Self {
        self.alter_tables.push(alter);
        self
    }

    pub fn delete(mut self, delete: DeleteData) -> Self {
        self.delete_data.push(delete);
        self
    }

    pub fn drop_table(mut self, name: &str) -> Self {
        self.drop_tables.push(DropObject::new(name));
        self
    }

    pub fn rename_table(mut self, from: &str, to: &str) -> Self {
        self.rename_tables.push(Rename::new(from, to));
        self
    }
}

/// Transaction envelope settings for a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation_level: Option<IsolationLevel>,
}

fn default_enabled() -> bool {
    true
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            isolation_level: None,
        }
    }
}

impl TransactionConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            isolation_level: None,
        }
    }

    pub fn with_isolation(level: IsolationLevel) -> Self {
        Self {
            enabled: true,
            isolation_level: Some(level),
        }
    }
}

/// SQL standard isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "READ UNCOMMITTED" => Ok(Self::ReadUncommitted),
            "READ COMMITTED" => Ok(Self::ReadCommitted),
            "REPEATABLE READ" => Ok(Self::RepeatableRead),
            "SERIALIZABLE" => Ok(Self::Serializable),
            _ => Err(format!("unknown isolation level '{}'", s)),
        }
    }
}

impl TryFrom<String> for IsolationLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IsolationLevel> for String {
    fn from(value: IsolationLevel) -> Self {
        value.as_sql().to_string()
    }
}
