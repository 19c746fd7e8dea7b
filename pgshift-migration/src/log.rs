use crate::{
    MigrationError,
    catalog::{Catalog, MigrationFile},
    printer::Printer,
    timer::Timer,
};
use chrono::DateTime;
use pgshift_backend::generic::Ledger;
use std::collections::BTreeMap;

/// One row of the report: a timestamp seen in the ledger, on disk, or both.
#[derive(Debug, Default)]
struct LogGroup {
    in_db: bool,
    on_fs: Option<MigrationFile>,
}

/// Prints every known migration with where it was seen.
pub struct Log<'a> {
    pub catalog: &'a dyn Catalog,
    pub ledger: &'a dyn Ledger,
    pub printer: &'a dyn Printer,
    pub timer: &'a Timer,
}

impl Log<'_> {
    pub async fn run(&self) -> Result<(), MigrationError> {
        for (timestamp, group) in self.collect().await? {
            let date = DateTime::from_timestamp(timestamp, 0)
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| timestamp.to_string());
            let on_fs = group
                .on_fs
                .as_ref()
                .and_then(|file| file.up.as_deref())
                .unwrap_or_default();
            let in_db = if group.in_db {
                timestamp.to_string()
            } else {
                String::new()
            };

            self.printer.print_migration_row(&date, on_fs, &in_db);
        }

        Ok(())
    }

    async fn collect(&self) -> Result<BTreeMap<i64, LogGroup>, MigrationError> {
        let now = (self.timer.now)().timestamp();
        let mut groups: BTreeMap<i64, LogGroup> = BTreeMap::new();

        for timestamp in self.ledger.list().await? {
            groups.entry(timestamp).or_default().in_db = true;
        }

        for file in self.catalog.between(0, now).await? {
            let timestamp = file.timestamp;
            groups.entry(timestamp).or_default().on_fs = Some(file);
        }

        Ok(groups)
    }
}
