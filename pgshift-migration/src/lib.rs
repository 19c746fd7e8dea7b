mod catalog;
mod log;
mod printer;
mod runner;
mod squash;
mod timer;

#[cfg(test)]
mod fakes;

use thiserror::Error;

pub use catalog::{Catalog, DirCatalog, Direction, MigrationFile, MigrationFileList, file_names};
pub use log::Log;
pub use pgshift_backend::generic::{ExecutionContext, Ledger, LedgerError};
pub use printer::{ConsolePrinter, Printer};
pub use runner::Runner;
pub use squash::Squash;
pub use timer::{Target, TimeGetter, Timer};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("unable to parse date/time {0}")]
    ParseTime(String),
    #[error("invalid timestamp in migration file name {0}")]
    ParseFileName(String),
    #[error("nothing to pop: no migration has been applied")]
    PopExhausted,
    #[error("nothing to push: no pending migration after {0}")]
    PushExhausted(i64),
    #[error("migration {0} is missing its up or down file")]
    IncompletePair(i64),
    #[error("migration file {0} exists on disk but is not recorded in the database")]
    NotInLedger(i64),
    #[error("applied migrations have no files on disk: {0:?}")]
    NotOnDisk(Vec<i64>),
    #[error("applied migration {0} has no down file on disk")]
    MissingDownFile(i64),
    #[error("cannot squash an empty migration range")]
    EmptySquash,
    #[error("unable to access {name}: {source}")]
    Io {
        name: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
