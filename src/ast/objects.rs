//! Non-table schema objects: enums, views, routines, triggers, and the
//! drop/rename/delete shapes that act on them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// DROP for anything addressed by name alone (table, enum type, view,
/// materialized view, schema, function, procedure).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropObject {
    pub name: String,
    #[serde(default)]
    pub cascade: bool,
}

impl DropObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cascade: false,
        }
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// RENAME for tables, views, functions and procedures.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

impl Rename {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// DELETE FROM with an optional raw WHERE condition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteData {
    pub table: String,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl DeleteData {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            condition: None,
        }
    }

    pub fn filter(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEnum {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropRowPolicy {
    pub name: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateView {
    pub name: String,
    /// The SELECT body, without a trailing semicolon.
    pub query: String,
    #[serde(default)]
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFunction {
    pub name: String,
    /// Raw parameter list, e.g. `a integer, b integer`.
    #[serde(default)]
    pub params: String,
    pub returns: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProcedure {
    pub name: String,
    #[serde(default)]
    pub params: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTrigger {
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    #[serde(default = "default_true")]
    pub for_each_row: bool,
    /// Trigger action: `EXECUTE FUNCTION f()` on Postgres, a statement or
    /// `BEGIN ... END` block elsewhere.
    pub body: String,
    #[serde(default)]
    pub or_replace: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropTrigger {
    pub name: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameTrigger {
    pub table: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
            Self::InsteadOf => "INSTEAD OF",
        }
    }
}

impl std::str::FromStr for TriggerTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "BEFORE" => Ok(Self::Before),
            "AFTER" => Ok(Self::After),
            "INSTEAD OF" => Ok(Self::InsteadOf),
            _ => Err(format!("unknown trigger timing '{}'", s)),
        }
    }
}

impl TryFrom<String> for TriggerTiming {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerTiming> for String {
    fn from(value: TriggerTiming) -> Self {
        value.as_sql().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
    Truncate,
}

impl TriggerEvent {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for TriggerEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "TRUNCATE" => Ok(Self::Truncate),
            _ => Err(format!("unknown trigger event '{}'", s)),
        }
    }
}

impl TryFrom<String> for TriggerEvent {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerEvent> for String {
    fn from(value: TriggerEvent) -> Self {
        value.as_sql().to_string()
    }
}
