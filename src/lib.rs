//! # dbshift
//!
//! Compiles dialect-neutral migrations into SQL for PostgreSQL, MySQL and
//! SQLite, and tracks which migrations have been applied.
//!
//! ## Quick Example
//!
//! ```rust
//! use dbshift::prelude::*;
//!
//! let users = CreateTable::new("users")
//!     .column(Column::new("id", "number").auto_increment())
//!     .column(Column::new("email", "string").size(255).not_null())
//!     .primary_key(&["id"]);
//!
//! let tracker = SchemaTracker::new();
//! let compiler = Compiler::new(Dialect::Postgres.generator(), &tracker);
//! let sql = compiler
//!     .compile_operation(&Operation::new().create_table(users))
//!     .unwrap();
//!
//! assert_eq!(
//!     sql,
//!     vec![r#"CREATE TABLE "users" ("id" SERIAL, "email" VARCHAR(255) NOT NULL, PRIMARY KEY ("id"));"#]
//! );
//! ```
//!
//! ## Engines
//!
//! | Engine   | Quoting    | DROP/RENAME COLUMN        |
//! |----------|------------|---------------------------|
//! | Postgres | `"name"`   | native                    |
//! | MySQL    | `` `name` `` | native (rename needs type) |
//! | SQLite   | `"name"`   | table recreation          |

pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod migrate;
pub mod snapshot;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::compiler::{Compiler, wrap_in_transaction};
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::migrate::{Driver, LoggingExecutor, MigrationState, StatementExecutor};
    pub use crate::snapshot::SchemaTracker;
    pub use crate::transpiler::{Dialect, SqlGenerator};
}
