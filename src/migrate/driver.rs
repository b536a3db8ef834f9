//! The migration pipeline.
//!
//! Apply, rollback and reset hold the run-level lock for their whole
//! duration; read-only operations (validate, status, plan) do not take it.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::ast::{Direction, Migration};
use crate::compiler::{Compiler, wrap_in_transaction};
use crate::config::Config;
use crate::error::{MigrateError, MigrateResult};
use crate::migrate::executor::{LoggingExecutor, StatementExecutor};
use crate::migrate::history::HistoryStore;
use crate::migrate::loader::{self, MigrationSource};
use crate::migrate::lock::MigrationLock;
use crate::snapshot::SchemaTracker;
use crate::transpiler::Dialect;

/// Where one migration stands relative to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Applied,
    Pending,
    /// Applied, but the source changed since.
    Drifted,
    /// Recorded as applied, but its source is gone.
    Missing,
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::Drifted => "drifted",
            Self::Missing => "missing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: String,
    pub state: MigrationState,
}

pub struct Driver<E: StatementExecutor = LoggingExecutor> {
    config: Config,
    dialect: Dialect,
    executor: E,
}

impl Driver<LoggingExecutor> {
    /// A driver that only logs the statements it would run.
    pub fn logging(config: Config) -> Self {
        Self::new(config, LoggingExecutor::new())
    }
}

impl<E: StatementExecutor> Driver<E> {
    pub fn new(config: Config, executor: E) -> Self {
        let dialect = config.dialect();
        Self {
            config,
            dialect,
            executor,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    fn lock(&self) -> MigrateResult<MigrationLock> {
        MigrationLock::acquire(&self.config.lock_file)
    }

    fn history(&self) -> MigrateResult<HistoryStore> {
        HistoryStore::open(&self.config.history_file)
    }

    fn source(&self, name: &str) -> MigrateResult<MigrationSource> {
        loader::read_source(&self.config.migrations_dir, name)
    }

    fn discover(&self) -> MigrateResult<Vec<String>> {
        loader::discover(&self.config.migrations_dir)
    }

    /// Apply one migration by name. Re-applying an unchanged migration runs
    /// it again; a changed one fails with `ChecksumMismatch`.
    pub fn apply_migration(&mut self, name: &str) -> MigrateResult<()> {
        let _lock = self.lock()?;
        let history = self.history()?;
        let tracker = self.warm_up(&history.applied_before(name))?;
        self.apply_one(&history, &tracker, name)
    }

    /// Apply every discovered, unapplied migration in name order, stopping
    /// at the first failure or when the configured deadline passes.
    /// Returns the names applied.
    pub fn apply_pending(&mut self) -> MigrateResult<Vec<String>> {
        let _lock = self.lock()?;
        let history = self.history()?;
        let tracker = self.warm_up(&history.applied())?;
        let pending: Vec<String> = self
            .discover()?
            .into_iter()
            .filter(|n| !history.is_applied(n))
            .collect();

        let deadline = self.config.timeout().map(|t| Instant::now() + t);
        let mut applied = Vec::new();
        for (idx, name) in pending.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(remaining = pending.len() - idx, "deadline exceeded");
                return Err(MigrateError::DeadlineExceeded(pending[idx..].to_vec()));
            }
            self.apply_one(&history, &tracker, name)?;
            applied.push(name.clone());
        }
        info!(count = applied.len(), "applied pending migrations");
        Ok(applied)
    }

    /// Undo the `steps` most recently applied migrations, in reverse
    /// application order, removing each from the history as it is undone.
    /// Returns the names rolled back.
    pub fn rollback_migration(&mut self, steps: usize) -> MigrateResult<Vec<String>> {
        let _lock = self.lock()?;
        let history = self.history()?;
        let applied = history.applied();
        let tracker = self.warm_up(&applied)?;

        let mut rolled_back = Vec::new();
        for name in applied.iter().rev().take(steps) {
            let source = self.source(name)?;
            verify_checksum(&history, &source)?;
            let migration = source.parse()?;
            info!(migration = %name, "rolling back");
            self.run(&migration, Direction::Down, &tracker)?;
            history.remove(name)?;
            rolled_back.push(name.clone());
        }
        info!(count = rolled_back.len(), "rollback complete");
        Ok(rolled_back)
    }

    /// Forget every applied migration. The schema itself is untouched.
    pub fn reset_migrations(&mut self) -> MigrateResult<()> {
        let _lock = self.lock()?;
        let history = self.history()?;
        let count = history.len();
        history.clear()?;
        info!(cleared = count, "migration history reset");
        Ok(())
    }

    /// Fail with `PendingMigrations` if any discovered migration has not
    /// been applied.
    pub fn validate_migrations(&self) -> MigrateResult<()> {
        let history = self.history()?;
        let discovered = self.discover()?;

        let known: BTreeSet<&str> = discovered.iter().map(String::as_str).collect();
        for orphan in history.applied().iter().filter(|n| !known.contains(n.as_str())) {
            warn!(migration = %orphan, "applied migration has no source file");
        }

        let pending: Vec<String> = discovered
            .into_iter()
            .filter(|n| !history.is_applied(n))
            .collect();
        if pending.is_empty() {
            info!("all migrations applied");
            Ok(())
        } else {
            Err(MigrateError::PendingMigrations(pending))
        }
    }

    pub fn create_migration_file(&self, name: &str) -> MigrateResult<PathBuf> {
        loader::create_migration_file(&self.config.migrations_dir, name, Local::now())
    }

    /// State of every discovered migration, then any recorded migration
    /// whose source is gone.
    pub fn status(&self) -> MigrateResult<Vec<MigrationStatus>> {
        let history = self.history()?;
        let discovered = self.discover()?;

        let mut out = Vec::with_capacity(discovered.len());
        for name in &discovered {
            let state = match history.checksum(name) {
                None => MigrationState::Pending,
                Some(recorded) => {
                    if recorded == self.source(name)?.checksum() {
                        MigrationState::Applied
                    } else {
                        MigrationState::Drifted
                    }
                }
            };
            out.push(MigrationStatus {
                name: name.clone(),
                state,
            });
        }
        for name in history.applied() {
            if !discovered.contains(&name) {
                out.push(MigrationStatus {
                    name,
                    state: MigrationState::Missing,
                });
            }
        }
        Ok(out)
    }

    /// The wrapped statements one side of a migration would run, without
    /// executing or recording anything.
    pub fn plan(&self, name: &str, direction: Direction) -> MigrateResult<Vec<String>> {
        let history = self.history()?;
        let mut replay = history.applied_before(name);
        if direction == Direction::Down {
            replay.push(name.to_string());
        }
        let tracker = self.warm_up(&replay)?;
        let migration = self.source(name)?.parse()?;
        self.compile(&migration, direction, &tracker)
    }

    fn apply_one(
        &mut self,
        history: &HistoryStore,
        tracker: &SchemaTracker,
        name: &str,
    ) -> MigrateResult<()> {
        let source = self.source(name)?;
        let sum = verify_checksum(history, &source)?;
        let migration = source.parse()?;

        info!(migration = %name, "applying");
        self.run(&migration, Direction::Up, tracker)?;
        history.record(name, &sum)?;
        info!(migration = %name, checksum = %sum, "applied");
        Ok(())
    }

    /// Compile one side, then run pre-checks, the statements and post-checks.
    fn run(
        &mut self,
        migration: &Migration,
        direction: Direction,
        tracker: &SchemaTracker,
    ) -> MigrateResult<()> {
        let statements = self.compile(migration, direction, tracker)?;
        self.run_checks(migration, "pre", &migration.pre_checks)?;
        self.executor.execute(&migration.name, &statements)?;
        self.run_checks(migration, "post", &migration.post_checks)
    }

    fn run_checks(
        &mut self,
        migration: &Migration,
        phase: &'static str,
        checks: &[String],
    ) -> MigrateResult<()> {
        for check in checks {
            if let Err(e) = self.executor.check(&migration.name, check) {
                warn!(migration = %migration.name, phase, check = %check, error = %e, "check failed");
                return Err(MigrateError::CheckFailed {
                    migration: migration.name.clone(),
                    phase,
                    check: check.clone(),
                });
            }
        }
        Ok(())
    }

    fn compile(
        &self,
        migration: &Migration,
        direction: Direction,
        tracker: &SchemaTracker,
    ) -> MigrateResult<Vec<String>> {
        let generator = self.dialect.generator();
        let compiler = Compiler::new(generator, tracker);
        let statements = migration.compile(direction, &compiler)?;
        let transaction = migration
            .transaction
            .clone()
            .unwrap_or_else(|| self.config.transaction.clone());
        Ok(wrap_in_transaction(generator, &statements, &transaction))
    }

    /// A fresh tracker holding the table shapes left by the `up` side of
    /// `names`, for dialects that need one.
    fn warm_up(&self, names: &[String]) -> MigrateResult<SchemaTracker> {
        let tracker = SchemaTracker::new();
        let generator = self.dialect.generator();
        if !generator.requires_schema_tracking() {
            return Ok(tracker);
        }

        let compiler = Compiler::new(generator, &tracker);
        for name in names {
            let source = match self.source(name) {
                Ok(source) => source,
                Err(MigrateError::MigrationNotFound(_)) => {
                    warn!(migration = %name, "applied migration has no source file, skipping replay");
                    continue;
                }
                Err(e) => return Err(e),
            };
            source.parse()?.compile(Direction::Up, &compiler)?;
        }
        debug!(tables = tracker.len(), "schema snapshot warmed up");
        Ok(tracker)
    }
}

/// Compare the source checksum with the recorded one, if any, and return it.
fn verify_checksum(history: &HistoryStore, source: &MigrationSource) -> MigrateResult<String> {
    let actual = source.checksum();
    match history.checksum(&source.name) {
        Some(recorded) if recorded != actual => Err(MigrateError::ChecksumMismatch {
            name: source.name.clone(),
            recorded,
            actual,
        }),
        Some(_) => {
            debug!(migration = %source.name, "checksum unchanged");
            Ok(actual)
        }
        None => Ok(actual),
    }
}
