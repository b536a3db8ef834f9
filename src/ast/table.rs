//! Table and column shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::Value;

/// CREATE TABLE description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTable {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Composite key. When empty, columns flagged `primary_key` form the key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
}

impl CreateTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// The effective key: the declared list, or the flagged columns in order.
    pub fn key_columns(&self) -> Vec<String> {
        if !self.primary_key.is_empty() {
            return self.primary_key.clone();
        }
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A column definition, used both in CREATE TABLE and ALTER TABLE ADD COLUMN.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Column {
    pub name: String,
    /// Generic type tag (`string`, `number`, `boolean`, `date`, `datetime`, ...)
    /// or a native type literal that is passed through.
    #[serde(rename = "type")]
    pub data_type: String,
    /// `Some(false)` emits NOT NULL; unset leaves nullability to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
}

/// ALTER TABLE ... ADD COLUMN takes the same shape as a table column.
pub type AddColumn = Column;

impl Column {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            ..Default::default()
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn check(mut self, expr: &str) -> Self {
        self.check = Some(expr.to_string());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.foreign_key = Some(ForeignKey::new(table, column));
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let Some(fk) = self.foreign_key.as_mut() {
            fk.on_delete = Some(action);
        }
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        if let Some(fk) = self.foreign_key.as_mut() {
            fk.on_update = Some(action);
        }
        self
    }

    /// Whether the generic type is the string family (defaults get quoted).
    pub fn is_string_type(&self) -> bool {
        matches!(self.data_type.to_lowercase().as_str(), "string" | "text")
    }
}

/// Foreign key reference attached to a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKey {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            on_delete: None,
            on_update: None,
        }
    }
}

/// ON DELETE / ON UPDATE action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for ReferentialAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "CASCADE" => Ok(Self::Cascade),
            "SET NULL" => Ok(Self::SetNull),
            "SET DEFAULT" => Ok(Self::SetDefault),
            "RESTRICT" => Ok(Self::Restrict),
            "NO ACTION" => Ok(Self::NoAction),
            _ => Err(format!("unknown referential action '{}'", s)),
        }
    }
}

impl TryFrom<String> for ReferentialAction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferentialAction> for String {
    fn from(value: ReferentialAction) -> Self {
        value.as_sql().to_string()
    }
}

/// ALTER TABLE description. Adds, drops and renames are batched per table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlterTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_columns: Vec<AddColumn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rename_columns: Vec<RenameColumn>,
}

impl AlterTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.add_columns.push(column);
        self
    }

    pub fn drop_column(mut self, column: &str) -> Self {
        self.drop_columns.push(column.to_string());
        self
    }

    pub fn rename_column(mut self, from: &str, to: &str) -> Self {
        self.rename_columns.push(RenameColumn::new(from, to));
        self
    }

    /// True when the batch needs DROP or RENAME COLUMN support.
    pub fn is_destructive(&self) -> bool {
        !self.drop_columns.is_empty() || !self.rename_columns.is_empty()
    }
}

/// RENAME COLUMN. The type is only needed by engines that redeclare the
/// column when renaming it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameColumn {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl RenameColumn {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, data_type: &str) -> Self {
        self.data_type = Some(data_type.to_string());
        self
    }
}
