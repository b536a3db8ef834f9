//! End-to-end pipeline tests against a temporary project directory.

use std::fs;

use dbshift::migrate::{HistoryStore, checksum};
use dbshift::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CREATE_USERS: &str = r#"
version = "1.0.0"
description = "users table"

[[up]]
[[up.create_tables]]
name = "users"
primary_key = ["id"]
columns = [
  { name = "id", type = "number", auto_increment = true },
  { name = "email", type = "string", size = 255, nullable = false },
  { name = "nickname", type = "string", size = 40 },
]

[[down]]
drop_tables = [{ name = "users" }]
"#;

const RENAME_EMAIL: &str = r#"
[[up]]
[[up.alter_tables]]
name = "users"
drop_columns = ["nickname"]
rename_columns = [{ from = "email", to = "login", type = "string" }]

[[down]]
[[down.alter_tables]]
name = "users"
rename_columns = [{ from = "login", to = "email", type = "string" }]
"#;

fn project(driver: &str) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::in_dir(dir.path()).driver(driver);
    fs::create_dir_all(&config.migrations_dir).unwrap();
    fs::write(config.migrations_dir.join("001_users.toml"), CREATE_USERS).unwrap();
    fs::write(config.migrations_dir.join("002_rename_email.toml"), RENAME_EMAIL).unwrap();
    (dir, config)
}

fn history(config: &Config) -> HistoryStore {
    HistoryStore::open(&config.history_file).unwrap()
}

#[test]
fn test_full_lifecycle_postgres() {
    let (_dir, config) = project("postgres");
    let mut driver = Driver::logging(config.clone());

    let err = driver.validate_migrations().unwrap_err();
    assert_eq!(err.to_string(), "2 unapplied migration(s): 001_users, 002_rename_email");

    let applied = driver.apply_pending().unwrap();
    assert_eq!(applied, vec!["001_users", "002_rename_email"]);
    driver.validate_migrations().unwrap();

    assert_eq!(
        driver.executor().statements_for("002_rename_email"),
        vec![
            "BEGIN;",
            "ALTER TABLE \"users\" DROP COLUMN \"nickname\";",
            "ALTER TABLE \"users\" RENAME COLUMN \"email\" TO \"login\";",
            "COMMIT;",
        ]
    );

    let rolled_back = driver.rollback_migration(1).unwrap();
    assert_eq!(rolled_back, vec!["002_rename_email"]);
    assert_eq!(history(&config).applied(), vec!["001_users"]);

    driver.reset_migrations().unwrap();
    assert!(history(&config).is_empty());
    assert!(!config.lock_file.exists());
}

#[test]
fn test_reapply_unchanged_keeps_history() {
    let (_dir, config) = project("postgres");
    let mut driver = Driver::logging(config.clone());

    driver.apply_migration("001_users").unwrap();
    let recorded = history(&config).checksum("001_users");
    driver.apply_migration("001_users").unwrap();

    assert_eq!(history(&config).checksum("001_users"), recorded);
    assert_eq!(driver.executor().statements_for("001_users").len(), 6);
}

#[test]
fn test_modified_source_is_rejected() {
    let (_dir, config) = project("postgres");
    let mut driver = Driver::logging(config.clone());
    driver.apply_migration("001_users").unwrap();
    let recorded = history(&config).checksum("001_users").unwrap();

    let edited = CREATE_USERS.replace("size = 40", "size = 80");
    fs::write(config.migrations_dir.join("001_users.toml"), &edited).unwrap();

    match driver.apply_migration("001_users").unwrap_err() {
        MigrateError::ChecksumMismatch {
            name,
            recorded: r,
            actual,
        } => {
            assert_eq!(name, "001_users");
            assert_eq!(r, recorded);
            assert_eq!(actual, checksum(edited.as_bytes()));
        }
        other => panic!("expected checksum mismatch, got {other:?}"),
    }
    assert_eq!(history(&config).checksum("001_users"), Some(recorded));
    assert!(!config.lock_file.exists());
}

#[test]
fn test_sqlite_recreation_across_runs() {
    let (_dir, config) = project("sqlite");

    Driver::logging(config.clone()).apply_migration("001_users").unwrap();

    let mut driver = Driver::logging(config.clone());
    driver.apply_migration("002_rename_email").unwrap();
    assert_eq!(
        driver.executor().statements_for("002_rename_email"),
        vec![
            "BEGIN TRANSACTION;",
            "PRAGMA foreign_keys = OFF;",
            "ALTER TABLE \"users\" RENAME TO \"_users_backup\";",
            "CREATE TABLE \"users\" (\"id\" INTEGER, \"login\" TEXT NOT NULL, PRIMARY KEY (\"id\"));",
            "INSERT INTO \"users\" (\"id\", \"login\") SELECT \"id\", \"email\" FROM \"_users_backup\";",
            "DROP TABLE IF EXISTS \"_users_backup\";",
            "PRAGMA foreign_keys = ON;",
            "COMMIT;",
        ]
    );

    let mut driver = Driver::logging(config.clone());
    driver.rollback_migration(1).unwrap();
    let down = driver.executor().statements_for("002_rename_email");
    assert!(down.contains(
        &"INSERT INTO \"users\" (\"id\", \"email\") SELECT \"id\", \"login\" FROM \"_users_backup\";"
    ));
}

#[test]
fn test_rollback_newest_first() {
    let (_dir, config) = project("mysql");
    let mut driver = Driver::logging(config.clone());
    driver.apply_pending().unwrap();

    let undone = driver.rollback_migration(5).unwrap();
    assert_eq!(undone, vec!["002_rename_email", "001_users"]);
    assert!(history(&config).is_empty());

    let executed = driver.executor().executed();
    let last = &executed[executed.len() - 2];
    assert_eq!(last.0, "001_users");
    assert_eq!(last.1, "DROP TABLE IF EXISTS `users`;");
}

#[test]
fn test_deadline_stops_pending_run() {
    let (_dir, config) = project("postgres");
    let mut driver = Driver::logging(config.clone().timeout_secs(0));

    match driver.apply_pending().unwrap_err() {
        MigrateError::DeadlineExceeded(remaining) => {
            assert_eq!(remaining, vec!["001_users", "002_rename_email"]);
        }
        other => panic!("expected deadline error, got {other:?}"),
    }
    assert!(history(&config).is_empty());
    assert!(!config.lock_file.exists());
}

#[test]
fn test_compile_error_stops_batch() {
    let (_dir, config) = project("sqlite");
    fs::write(
        config.migrations_dir.join("000_enum.toml"),
        "[[up]]\ncreate_enums = [{ name = \"mood\", values = [\"ok\"] }]\n",
    )
    .unwrap();

    let mut driver = Driver::logging(config.clone());
    let err = driver.apply_pending().unwrap_err();
    assert!(matches!(
        err.root_cause(),
        MigrateError::UnsupportedOperation { dialect: "sqlite", .. }
    ));
    assert!(history(&config).is_empty());
    assert!(driver.executor().executed().is_empty());
}

#[test]
fn test_create_then_apply() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::in_dir(dir.path());
    let mut driver = Driver::logging(config.clone());

    let path = driver.create_migration_file("empty_step").unwrap();
    let name = path.file_stem().unwrap().to_str().unwrap().to_string();
    assert!(name.ends_with("_empty_step"));

    driver.apply_migration(&name).unwrap();
    assert!(driver.executor().executed().is_empty());
    assert!(history(&config).is_applied(&name));
}

#[test]
fn test_sqlite_reapply_earlier_migration() {
    let (_dir, config) = project("sqlite");
    let mut driver = Driver::logging(config.clone());
    driver.apply_pending().unwrap();

    let mut driver = Driver::logging(config.clone());
    driver.apply_migration("001_users").unwrap();
    let stmts = driver.executor().statements_for("001_users");
    assert_eq!(stmts.first(), Some(&"BEGIN TRANSACTION;"));
    assert!(stmts[1].starts_with("CREATE TABLE \"users\""));
    assert_eq!(history(&config).applied(), vec!["001_users", "002_rename_email"]);
}

#[test]
fn test_rollback_follows_application_order() {
    let (_dir, config) = project("postgres");
    let mut driver = Driver::logging(config.clone());
    driver.apply_migration("002_rename_email").unwrap();
    driver.apply_migration("001_users").unwrap();
    assert_eq!(history(&config).applied(), vec!["002_rename_email", "001_users"]);

    let undone = driver.rollback_migration(1).unwrap();
    assert_eq!(undone, vec!["001_users"]);
    assert_eq!(history(&config).applied(), vec!["002_rename_email"]);
}
