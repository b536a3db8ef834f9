//! Shared DDL fragments.
//!
//! Generic over the generator so trait default methods can call them.

use crate::ast::{Column, CreateTable, ForeignKey, Value};
use crate::transpiler::traits::SqlGenerator;

/// Trim trailing whitespace and semicolons from user-supplied SQL.
pub fn strip_terminator(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Comma-separated quoted identifiers.
pub fn quote_list<G: SqlGenerator + ?Sized>(generator: &G, names: &[String]) -> String {
    names
        .iter()
        .map(|n| generator.quote_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a default value. String-typed columns get their default quoted
/// unless it is quoted already.
pub fn default_literal(column: &Column, value: &Value) -> String {
    if !column.is_string_type() {
        return value.to_string();
    }
    let raw = value.to_string();
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        raw
    } else {
        format!("'{}'", raw.replace('\'', "''"))
    }
}

/// `<name> <type>[ NOT NULL][ DEFAULT <value>][ CHECK (<expr>)]`
pub fn column_definition<G: SqlGenerator + ?Sized>(generator: &G, column: &Column) -> String {
    let mut def = format!(
        "{} {}",
        generator.quote_identifier(&column.name),
        generator.map_data_type(&column.data_type, column.size, column.auto_increment)
    );

    if column.nullable == Some(false) {
        def.push_str(" NOT NULL");
    }

    if let Some(value) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_literal(column, value));
    }

    if let Some(check) = &column.check {
        def.push_str(&format!(" CHECK ({})", check));
    }

    def
}

/// `REFERENCES <table> (<column>)[ ON DELETE ...][ ON UPDATE ...]`
pub fn foreign_key_reference<G: SqlGenerator + ?Sized>(generator: &G, fk: &ForeignKey) -> String {
    let mut sql = format!(
        "REFERENCES {} ({})",
        generator.quote_identifier(&fk.table),
        generator.quote_identifier(&fk.column)
    );
    if let Some(action) = fk.on_delete {
        sql.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = fk.on_update {
        sql.push_str(&format!(" ON UPDATE {}", action));
    }
    sql
}

/// The CREATE TABLE statement alone, without indexes.
pub fn create_table_definition<G: SqlGenerator + ?Sized>(generator: &G, table: &CreateTable) -> String {
    let mut defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_definition(generator, c))
        .collect();

    let key = table.key_columns();
    if !key.is_empty() {
        defs.push(format!("PRIMARY KEY ({})", quote_list(generator, &key)));
    }

    for column in &table.columns {
        if let Some(fk) = &column.foreign_key {
            defs.push(format!(
                "FOREIGN KEY ({}) {}",
                generator.quote_identifier(&column.name),
                foreign_key_reference(generator, fk)
            ));
        }
    }

    format!(
        "CREATE TABLE {} ({});",
        generator.quote_identifier(&table.name),
        defs.join(", ")
    )
}

/// Index names follow the Postgres convention: `<table>_<column>_key` for
/// unique indexes, `_idx` for plain ones, `_fkey` for foreign keys.
pub fn object_name(table: &str, column: &str, suffix: &str) -> String {
    let base = table.rsplit('.').next().unwrap_or(table);
    format!("{}_{}_{}", base, column, suffix)
}

/// CREATE UNIQUE INDEX / CREATE INDEX for a column's flags.
pub fn column_indexes<G: SqlGenerator + ?Sized>(generator: &G, table: &str, column: &Column) -> Vec<String> {
    let mut stmts = Vec::new();
    let quoted_table = generator.quote_identifier(table);
    let quoted_col = generator.quote_identifier(&column.name);

    if column.unique {
        stmts.push(format!(
            "CREATE UNIQUE INDEX {} ON {} ({});",
            generator.quote_identifier(&object_name(table, &column.name, "key")),
            quoted_table,
            quoted_col
        ));
    }
    if column.index {
        stmts.push(format!(
            "CREATE INDEX {} ON {} ({});",
            generator.quote_identifier(&object_name(table, &column.name, "idx")),
            quoted_table,
            quoted_col
        ));
    }
    stmts
}

/// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY ...`
pub fn add_foreign_key<G: SqlGenerator + ?Sized>(
    generator: &G,
    table: &str,
    column: &str,
    fk: &ForeignKey,
) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) {};",
        generator.quote_identifier(table),
        generator.quote_identifier(&object_name(table, column, "fkey")),
        generator.quote_identifier(column),
        foreign_key_reference(generator, fk)
    )
}

pub fn drop_table_if_exists<G: SqlGenerator + ?Sized>(generator: &G, table: &str, cascade: bool) -> String {
    let cascade = if cascade { " CASCADE" } else { "" };
    format!("DROP TABLE IF EXISTS {}{};", generator.quote_identifier(table), cascade)
}

/// `DROP <kind> IF EXISTS <name>[ CASCADE];` for name-addressed objects.
pub fn drop_object<G: SqlGenerator + ?Sized>(generator: &G, kind: &str, name: &str, cascade: bool) -> String {
    let cascade = if cascade { " CASCADE" } else { "" };
    format!("DROP {} IF EXISTS {}{};", kind, generator.quote_identifier(name), cascade)
}

/// `ALTER <kind> <from> RENAME TO <to>;`
pub fn alter_rename<G: SqlGenerator + ?Sized>(generator: &G, kind: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER {} {} RENAME TO {};",
        kind,
        generator.quote_identifier(from),
        generator.quote_identifier(to)
    )
}

/// Normalized generic tag, used for type matching.
pub fn type_key(data_type: &str) -> String {
    data_type.trim().to_lowercase()
}
