//! dbshift: migration compiler CLI
//!
//! Statements are logged, not sent to a database.
//!
//! # Usage
//!
//! ```bash
//! # Apply every pending migration
//! dbshift apply
//!
//! # Show what a migration would run
//! dbshift plan 20240309140507_add_users --down
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use dbshift::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbshift")]
#[command(version)]
#[command(about = "Compile and track dialect-neutral SQL migrations", long_about = None)]
#[command(after_help = "EXAMPLES:
    dbshift create add_users
    dbshift apply
    dbshift rollback --steps 2
    dbshift --config ci.toml validate")]
struct Cli {
    /// Config file (defaults to ./dbshift.toml, then the user config dir)
    #[arg(short, long, global = true, env = "DBSHIFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one migration, or every pending one
    Apply {
        /// Migration name (file stem)
        name: Option<String>,
    },
    /// Undo the most recently applied migrations
    Rollback {
        #[arg(short, long, default_value_t = 1)]
        steps: usize,
    },
    /// Forget all applied migrations (schema is untouched)
    Reset,
    /// Fail if any migration has not been applied
    Validate,
    /// List migrations and their state
    Status,
    /// Print the statements a migration would run
    Plan {
        name: String,
        /// Plan the down side instead
        #[arg(long)]
        down: bool,
    },
    /// Create a new timestamped migration file
    Create { name: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbshift=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let mut driver = Driver::logging(config);

    match cli.command {
        Commands::Apply { name: Some(name) } => {
            driver.apply_migration(&name)?;
            println!("{} {}", "✓ Applied".green(), name);
        }
        Commands::Apply { name: None } => {
            let applied = driver.apply_pending()?;
            if applied.is_empty() {
                println!("{}", "Nothing to apply".dimmed());
            }
            for name in applied {
                println!("{} {}", "✓ Applied".green(), name);
            }
        }
        Commands::Rollback { steps } => {
            let undone = driver.rollback_migration(steps)?;
            if undone.is_empty() {
                println!("{}", "Nothing to roll back".dimmed());
            }
            for name in undone {
                println!("{} {}", "↩ Rolled back".yellow(), name);
            }
        }
        Commands::Reset => {
            driver.reset_migrations()?;
            println!("{}", "History cleared".yellow());
        }
        Commands::Validate => {
            driver.validate_migrations()?;
            println!("{}", "✓ All migrations applied".green());
        }
        Commands::Status => {
            println!("{} ({})", "Migrations".cyan().bold(), driver.dialect());
            for entry in driver.status()? {
                let label = format!("{:<9}", entry.state.to_string());
                let label = match entry.state {
                    MigrationState::Applied => label.green(),
                    MigrationState::Pending => label.yellow(),
                    MigrationState::Drifted | MigrationState::Missing => label.red(),
                };
                println!("  {} {}", label, entry.name);
            }
        }
        Commands::Plan { name, down } => {
            let direction = if down { Direction::Down } else { Direction::Up };
            println!("{} {} ({})", "--".dimmed(), name.cyan(), direction);
            for stmt in driver.plan(&name, direction)? {
                println!("{}", stmt);
            }
        }
        Commands::Create { name } => {
            let path = driver.create_migration_file(&name)?;
            println!("{} {}", "✓ Created:".green(), path.display());
        }
    }
    Ok(())
}
