use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::commands;
use crate::config::ConfigError;
use pgshift_migration::{ConsolePrinter, LedgerError, MigrationError, Printer};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Store connection settings and create the ledger table")]
    Init {
        #[arg(long, default_value = ".", help = "directory holding migration files")]
        path: String,
        #[arg(long, default_value = "localhost", help = "PostgreSQL host")]
        db: String,
        #[arg(long, help = "database the migrations run against")]
        name: String,
        #[arg(long, help = "credentials in form username:password")]
        credentials: String,
        #[arg(long, default_value = "disable")]
        ssl: String,
        #[arg(long, default_value_t = 5432)]
        port: u16,
        #[arg(long, help = "print without colors")]
        no_color: bool,
    },
    #[command(about = "Create an empty up/down migration pair")]
    Add {
        #[arg(long, help = "label appended to the generated file names")]
        name: Option<String>,
    },
    #[command(about = "Apply and revert migrations to reach a point in time")]
    Run {
        #[arg(
            short,
            long,
            default_value = "",
            help = "target time, a unix timestamp, \"push\" or \"pop\""
        )]
        time: String,
        #[arg(long, help = "report the plan without executing it")]
        dry_run: bool,
    },
    #[command(about = "Merge an applied migration range into one pair")]
    Squash {
        #[arg(long, help = "time of the first migration in the range")]
        from: String,
        #[arg(long, help = "time of the last migration in the range")]
        to: String,
    },
    #[command(about = "Show where every known migration was seen")]
    Log,
}

#[derive(Parser, Debug)]
#[command(version, author)]
pub struct Cli {
    #[arg(
        global = true,
        short = 'c',
        long,
        env = "PGSHIFT_CONFIG_DIR",
        default_value = "./",
        help = "directory holding pgshift.config.json"
    )]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

pub async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let result = commands::dispatch(cli).await;
    if let Err(err) = &result {
        ConsolePrinter::new(true).print_error(&err.to_string());
    }

    result
}
