//! In-memory stand-ins wired through the trait seams in tests.

use crate::printer::Printer;
use pgshift_backend::generic::{ExecutionContext, Ledger, LedgerError};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemLedger {
    pub applied: Mutex<Vec<i64>>,
    pub executed: Mutex<Vec<ExecutionContext>>,
    pub squashes: Mutex<Vec<(i64, i64)>>,
    /// When set, `apply` fails for the context with this name.
    pub fail_on: Mutex<Option<String>>,
}

impl MemLedger {
    pub fn with_applied(timestamps: &[i64]) -> Self {
        let ledger = Self::default();
        *ledger.applied.lock().unwrap() = timestamps.to_vec();
        ledger
    }
}

#[async_trait::async_trait]
impl Ledger for MemLedger {
    fn table_name(&self) -> &str {
        "__pg_mig_meta"
    }

    async fn ensure(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<i64>, LedgerError> {
        let mut applied = self.applied.lock().unwrap().clone();
        applied.sort_unstable();
        Ok(applied)
    }

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LedgerError> {
        if self.fail_on.lock().unwrap().as_deref() == Some(ctx.name.as_str()) {
            return Err(LedgerError::Other(format!("forced failure on {}", ctx.name)));
        }

        let mut applied = self.applied.lock().unwrap();
        if ctx.is_up {
            applied.push(ctx.timestamp);
        } else {
            applied.retain(|ts| *ts != ctx.timestamp);
        }
        applied.sort_unstable();

        self.executed.lock().unwrap().push(ctx.clone());
        Ok(())
    }

    async fn squash_range(&self, from: i64, to: i64) -> Result<(), LedgerError> {
        let mut applied = self.applied.lock().unwrap();
        applied.retain(|ts| *ts < from || *ts > to);
        applied.push(to);
        applied.sort_unstable();

        self.squashes.lock().unwrap().push((from, to));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPrinter {
    pub ups: Mutex<Vec<String>>,
    pub downs: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub rows: Mutex<Vec<(String, String, String)>>,
}

impl Printer for RecordingPrinter {
    fn print_up(&self, text: &str) {
        self.ups.lock().unwrap().push(text.to_string());
    }

    fn print_down(&self, text: &str) {
        self.downs.lock().unwrap().push(text.to_string());
    }

    fn print_error(&self, text: &str) {
        self.errors.lock().unwrap().push(text.to_string());
    }

    fn print_success(&self, _text: &str) {}

    fn print_migration_row(&self, date: &str, on_fs: &str, in_db: &str) {
        self.rows
            .lock()
            .unwrap()
            .push((date.to_string(), on_fs.to_string(), in_db.to_string()));
    }
}
