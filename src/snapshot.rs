//! Schema snapshot tracking.
//!
//! Engines without DROP/RENAME COLUMN emulate them by recreating the table,
//! which needs the table's last known shape. [`SchemaTracker`] records that
//! shape from the operations compiled so far; nothing is introspected from a
//! live database.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::ast::{AlterTable, Column, CreateTable};
use crate::error::{MigrateError, MigrateResult};

/// Last known shape of every table seen by the compiler, keyed by name.
#[derive(Debug, Default)]
pub struct SchemaTracker {
    tables: Mutex<HashMap<String, CreateTable>>,
}

impl SchemaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a table, replacing any stale entry under that name.
    pub fn register(&self, table: &CreateTable) {
        self.tables.lock().insert(table.name.clone(), table.clone());
    }

    pub fn get(&self, name: &str) -> Option<CreateTable> {
        self.tables.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.lock().is_empty()
    }

    /// Move a snapshot to a new table name. Returns false if `from` was not
    /// tracked.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut tables = self.tables.lock();
        match tables.remove(from) {
            Some(mut table) => {
                table.name = to.to_string();
                tables.insert(to.to_string(), table);
                true
            }
            None => false,
        }
    }

    /// Read, transform and write back one table's snapshot while holding the
    /// lock. The snapshot is only replaced if `f` succeeds.
    pub fn alter<T, F>(&self, name: &str, f: F) -> MigrateResult<T>
    where
        F: FnOnce(&CreateTable) -> MigrateResult<(CreateTable, T)>,
    {
        let mut tables = self.tables.lock();
        let current = tables
            .get(name)
            .ok_or_else(|| MigrateError::SchemaNotFound(name.to_string()))?;
        let (next, output) = f(current)?;
        tables.insert(name.to_string(), next);
        Ok(output)
    }
}

/// The outcome of applying an alteration to a tracked table.
#[derive(Debug, Clone, PartialEq)]
pub struct Recreation {
    /// The table after the alteration.
    pub schema: CreateTable,
    /// `(new column, origin column)` pairs to copy from the old table.
    /// Columns added by the alteration have no origin and are absent.
    pub copy_columns: Vec<(String, String)>,
}

impl Recreation {
    pub fn target_columns(&self) -> Vec<String> {
        self.copy_columns.iter().map(|(new, _)| new.clone()).collect()
    }

    pub fn source_columns(&self) -> Vec<String> {
        self.copy_columns.iter().map(|(_, old)| old.clone()).collect()
    }
}

/// Compute the shape of `current` after `alter`.
///
/// Drops are resolved first, then renames, then adds. Renames may chain
/// within one alteration (`a -> b`, `b -> c`); the copy list always points
/// back at the column name in `current`.
pub fn plan_alteration(current: &CreateTable, alter: &AlterTable) -> MigrateResult<Recreation> {
    let mut schema = current.clone();
    // new name -> name in `current`
    let mut origins: HashMap<String, String> = HashMap::new();

    for column in &alter.drop_columns {
        let pos = position(&schema, column)?;
        schema.columns.remove(pos);
        schema.primary_key.retain(|k| k != column);
    }

    for rename in &alter.rename_columns {
        let pos = position(&schema, &rename.from)?;
        let col = &mut schema.columns[pos];
        col.name = rename.to.clone();
        if let Some(data_type) = &rename.data_type {
            col.data_type = data_type.clone();
            col.size = rename.size;
        }
        for key in schema.primary_key.iter_mut().filter(|k| **k == rename.from) {
            *key = rename.to.clone();
        }
        let origin = origins.remove(&rename.from).unwrap_or_else(|| rename.from.clone());
        origins.insert(rename.to.clone(), origin);
    }

    let copy_columns = schema
        .columns
        .iter()
        .map(|c| {
            let origin = origins.get(&c.name).cloned().unwrap_or_else(|| c.name.clone());
            (c.name.clone(), origin)
        })
        .collect();

    for column in &alter.add_columns {
        append_column(&mut schema, column);
    }

    Ok(Recreation {
        schema,
        copy_columns,
    })
}

/// Append a column, extending an explicit composite key if it is flagged.
pub fn append_column(schema: &mut CreateTable, column: &Column) {
    if column.primary_key && !schema.primary_key.is_empty() {
        schema.primary_key.push(column.name.clone());
    }
    schema.columns.push(column.clone());
}

fn position(schema: &CreateTable, column: &str) -> MigrateResult<usize> {
    schema
        .columns
        .iter()
        .position(|c| c.name == column)
        .ok_or_else(|| MigrateError::ColumnNotFound {
            table: schema.name.clone(),
            column: column.to_string(),
        })
}
