#[cfg(feature = "migration")]
pub use pgshift_migration::*;

#[cfg(feature = "backend")]
pub use pgshift_backend::generic::{ExecutionContext, Ledger, LedgerError};

#[cfg(feature = "cli")]
pub use pgshift_cli as cli;
