//! Migration pipeline: discovery, checksum gating, history, locking and
//! execution.

pub mod checksum;
pub mod driver;
pub mod executor;
pub mod history;
pub mod loader;
pub mod lock;

pub use checksum::checksum;
pub use driver::{Driver, MigrationState, MigrationStatus};
pub use executor::{LoggingExecutor, StatementExecutor};
pub use history::HistoryStore;
pub use loader::{MigrationSource, create_migration_file, discover, read_source};
pub use lock::MigrationLock;
