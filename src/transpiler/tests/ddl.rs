//! Shared DDL fragment tests.

use crate::ast::*;
use crate::transpiler::Dialect;
use crate::transpiler::ddl::*;

#[test]
fn test_strip_terminator() {
    assert_eq!(strip_terminator("SELECT 1;"), "SELECT 1");
    assert_eq!(strip_terminator("  SELECT 1 ; ;\n"), "SELECT 1");
    assert_eq!(strip_terminator("SELECT 1"), "SELECT 1");
}

#[test]
fn test_default_literal() {
    let text = Column::new("status", "string");
    let num = Column::new("count", "number");
    assert_eq!(default_literal(&text, &Value::from("draft")), "'draft'");
    assert_eq!(default_literal(&text, &Value::from("'draft'")), "'draft'");
    assert_eq!(default_literal(&text, &Value::from("it's")), "'it''s'");
    assert_eq!(default_literal(&num, &Value::from(0)), "0");
    assert_eq!(
        default_literal(&Column::new("at", "datetime"), &Value::from("CURRENT_TIMESTAMP")),
        "CURRENT_TIMESTAMP"
    );
}

#[test]
fn test_column_definition() {
    let g = Dialect::Postgres.generator();
    let column = Column::new("age", "number")
        .not_null()
        .default_value(18)
        .check("age >= 0");
    assert_eq!(
        column_definition(g, &column),
        "\"age\" INTEGER NOT NULL DEFAULT 18 CHECK (age >= 0)"
    );

    let explicit_null = Column::new("bio", "text").nullable();
    assert_eq!(column_definition(g, &explicit_null), "\"bio\" TEXT");
}

#[test]
fn test_primary_key_from_column_flags() {
    let g = Dialect::SQLite.generator();
    let table = CreateTable::new("memberships")
        .column(Column::new("user_id", "number").primary_key())
        .column(Column::new("team_id", "number").primary_key());
    assert_eq!(
        create_table_definition(g, &table),
        "CREATE TABLE \"memberships\" (\"user_id\" INTEGER, \"team_id\" INTEGER, PRIMARY KEY (\"user_id\", \"team_id\"));"
    );
}

#[test]
fn test_object_name_strips_schema() {
    assert_eq!(object_name("auth.users", "email", "key"), "users_email_key");
    assert_eq!(object_name("users", "email", "idx"), "users_email_idx");
}
