use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("migration {name} failed: {source}")]
    Execution { name: String, source: sqlx::Error },
    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
    #[error("{0}")]
    Other(String),
}

/// One unit of work handed to the ledger. Built per step, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub timestamp: i64,
    pub sql: String,
    pub name: String,
    pub is_up: bool,
}

/// Durable record of which migration timestamps have been applied.
///
/// `apply` must be all-or-nothing: the row mutation and the migration SQL
/// run in one transaction. `is_up` controls whether the row is inserted or
/// deleted.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    fn table_name(&self) -> &str;
    async fn ensure(&self) -> Result<(), LedgerError>;
    async fn list(&self) -> Result<Vec<i64>, LedgerError>;
    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LedgerError>;
    async fn squash_range(&self, from: i64, to: i64) -> Result<(), LedgerError>;
}
