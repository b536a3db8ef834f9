//! Error types for dbshift.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for compilation and the migration pipeline.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The target engine has no way to express the requested change.
    #[error("{dialect} does not support {operation}")]
    UnsupportedOperation {
        dialect: &'static str,
        operation: String,
    },

    /// Alteration of a table the snapshot tracker has never seen.
    #[error("no schema snapshot for table '{0}'; it must be created by a tracked migration first")]
    SchemaNotFound(String),

    /// Drop/rename of a column absent from the tracked schema.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// The engine redeclares the column on rename and needs its type.
    #[error("{dialect} needs an explicit type to rename column '{column}' of '{table}'")]
    MissingColumnType {
        dialect: &'static str,
        table: String,
        column: String,
    },

    /// A sub-operation failed; `source` is the underlying error.
    #[error("{operation} '{target}': {source}")]
    Compile {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Recorded checksum differs from the one computed on disk.
    #[error("checksum mismatch for migration '{name}': recorded {recorded}, found {actual}")]
    ChecksumMismatch {
        name: String,
        recorded: String,
        actual: String,
    },

    /// The run-level lock marker already exists.
    #[error("migration lock already held ({}); remove it if no run is in progress", .0.display())]
    LockAlreadyHeld(PathBuf),

    /// Malformed migration source.
    #[error("failed to parse migration '{name}': {message}")]
    Unmarshal { name: String, message: String },

    #[error("migration '{0}' not found")]
    MigrationNotFound(String),

    #[error("migration '{0}' already exists")]
    MigrationExists(String),

    #[error("invalid migration name '{0}': use letters, digits, '_' or '-'")]
    InvalidMigrationName(String),

    /// Validation found migrations with no recorded application.
    #[error("{} unapplied migration(s): {}", .0.len(), .0.join(", "))]
    PendingMigrations(Vec<String>),

    #[error("history file line {line}: {message}")]
    CorruptHistory { line: usize, message: String },

    #[error("{phase} check failed for migration '{migration}': {check}")]
    CheckFailed {
        migration: String,
        phase: &'static str,
        check: String,
    },

    /// The run deadline passed before these migrations were processed.
    #[error("deadline exceeded; not applied: {}", .0.join(", "))]
    DeadlineExceeded(Vec<String>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Create an unsupported-operation error for a dialect.
    pub fn unsupported(dialect: &'static str, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            dialect,
            operation: operation.into(),
        }
    }

    /// Wrap an error with the sub-operation and object it came from.
    pub fn context(self, operation: &'static str, target: impl Into<String>) -> Self {
        Self::Compile {
            operation,
            target: target.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any compile context.
    pub fn root_cause(&self) -> &MigrateError {
        match self {
            Self::Compile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for dbshift operations.
pub type MigrateResult<T> = Result<T, MigrateError>;
