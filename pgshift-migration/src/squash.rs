use crate::{
    MigrationError,
    catalog::{Catalog, MigrationFile},
    timer::Timer,
};
use pgshift_backend::generic::Ledger;
use std::collections::BTreeSet;

/// Collapses a contiguous applied range into one consolidated up/down pair
/// and one ledger row, after checking that disk and ledger agree on the
/// range.
pub struct Squash<'a> {
    pub catalog: &'a dyn Catalog,
    pub ledger: &'a dyn Ledger,
    pub timer: &'a Timer,
}

/// Every file must be complete and recorded in the ledger, and every ledger
/// entry in range must have a file. Each mismatch is its own error.
fn validate(files: &[MigrationFile], db_subset: &[i64]) -> Result<(), MigrationError> {
    let mut unmatched: BTreeSet<i64> = db_subset.iter().copied().collect();

    for file in files {
        if !file.is_complete() {
            return Err(MigrationError::IncompletePair(file.timestamp));
        }
        if !unmatched.remove(&file.timestamp) {
            return Err(MigrationError::NotInLedger(file.timestamp));
        }
    }

    if !unmatched.is_empty() {
        return Err(MigrationError::NotOnDisk(unmatched.into_iter().collect()));
    }

    Ok(())
}

impl Squash<'_> {
    pub async fn run(&self, from: &str, to: &str) -> Result<(), MigrationError> {
        let from = self.timer.parse_time(from)?.timestamp();
        let to = self.timer.parse_time(to)?.timestamp();

        // The range is inclusive on both ends; shifting the lower bound by
        // one second turns the catalog's (from, to] contract into [from, to].
        let files = self.catalog.between(from - 1, to).await?;
        let in_db = self.ledger.list().await?;
        let db_subset: Vec<i64> = in_db
            .into_iter()
            .filter(|ts| from <= *ts && *ts <= to)
            .collect();

        validate(&files, &db_subset)?;
        if files.is_empty() {
            return Err(MigrationError::EmptySquash);
        }

        self.ledger.squash_range(from, to).await?;
        self.catalog.squash(&files).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DirCatalog, file_names};
    use crate::fakes::MemLedger;
    use chrono::{DateTime, Utc};
    use tempfile::{TempDir, tempdir};
    use tokio::fs;

    fn timer() -> Timer {
        Timer::fixed(DateTime::<Utc>::from_timestamp(2_000, 0).unwrap())
    }

    fn complete(timestamp: i64) -> MigrationFile {
        let (up, down) = file_names(timestamp, None);
        MigrationFile {
            timestamp,
            up: Some(up),
            down: Some(down),
        }
    }

    async fn seed_pair(dir: &TempDir, ts: i64) {
        let (up, down) = file_names(ts, None);
        fs::write(dir.path().join(up), format!("up {ts}"))
            .await
            .unwrap();
        fs::write(dir.path().join(down), format!("down {ts}"))
            .await
            .unwrap();
    }

    async fn squash(
        dir: &TempDir,
        ledger: &MemLedger,
        from: &str,
        to: &str,
    ) -> Result<(), MigrationError> {
        let catalog = DirCatalog::new(dir.path());
        let timer = timer();
        Squash {
            catalog: &catalog,
            ledger,
            timer: &timer,
        }
        .run(from, to)
        .await
    }

    #[test]
    fn validate_accepts_matching_sets() {
        let files = vec![complete(1), complete(2)];
        assert!(validate(&files, &[1, 2]).is_ok());
    }

    #[test]
    fn validate_rejects_incomplete_pair() {
        let mut file = complete(1);
        file.down = None;
        assert!(matches!(
            validate(&[file], &[1]),
            Err(MigrationError::IncompletePair(1))
        ));
    }

    #[test]
    fn validate_rejects_file_missing_from_ledger() {
        let files = vec![complete(1), complete(2)];
        assert!(matches!(
            validate(&files, &[1]),
            Err(MigrationError::NotInLedger(2))
        ));
    }

    #[test]
    fn validate_rejects_ledger_entry_missing_from_disk() {
        let files = vec![complete(1)];
        assert!(matches!(
            validate(&files, &[1, 2, 3]),
            Err(MigrationError::NotOnDisk(left)) if left == vec![2, 3]
        ));
    }

    #[tokio::test]
    async fn squashes_range_on_disk_and_in_ledger() {
        let dir = tempdir().unwrap();
        for ts in [100, 200, 300] {
            seed_pair(&dir, ts).await;
        }
        let ledger = MemLedger::with_applied(&[100, 200, 300]);

        squash(&dir, &ledger, "100", "300").await.unwrap();

        assert_eq!(*ledger.applied.lock().unwrap(), vec![300]);
        assert_eq!(*ledger.squashes.lock().unwrap(), vec![(100, 300)]);
        assert!(dir.path().join("mig_300_squashed_up.sql").exists());
        assert!(dir.path().join("mig_300_squashed_down.sql").exists());
        assert!(!dir.path().join("mig_100_up.sql").exists());
        assert!(!dir.path().join("mig_200_down.sql").exists());
    }

    #[tokio::test]
    async fn range_is_inclusive_on_both_ends() {
        let dir = tempdir().unwrap();
        for ts in [100, 200, 300, 400] {
            seed_pair(&dir, ts).await;
        }
        let ledger = MemLedger::with_applied(&[100, 200, 300, 400]);

        squash(&dir, &ledger, "200", "300").await.unwrap();

        // 100 and 400 sit outside the range and survive untouched.
        assert_eq!(*ledger.applied.lock().unwrap(), vec![100, 300, 400]);
        assert!(dir.path().join("mig_100_up.sql").exists());
        assert!(dir.path().join("mig_400_up.sql").exists());
        assert!(!dir.path().join("mig_200_up.sql").exists());
    }

    #[tokio::test]
    async fn ledger_extra_entry_rejects_without_mutation() {
        let dir = tempdir().unwrap();
        seed_pair(&dir, 100).await;
        let ledger = MemLedger::with_applied(&[100, 200]);

        let err = squash(&dir, &ledger, "100", "300").await.unwrap_err();
        assert!(matches!(err, MigrationError::NotOnDisk(left) if left == vec![200]));

        assert_eq!(*ledger.applied.lock().unwrap(), vec![100, 200]);
        assert!(ledger.squashes.lock().unwrap().is_empty());
        assert!(dir.path().join("mig_100_up.sql").exists());
    }

    #[tokio::test]
    async fn unapplied_file_rejects_without_mutation() {
        let dir = tempdir().unwrap();
        seed_pair(&dir, 100).await;
        seed_pair(&dir, 200).await;
        let ledger = MemLedger::with_applied(&[100]);

        let err = squash(&dir, &ledger, "100", "300").await.unwrap_err();
        assert!(matches!(err, MigrationError::NotInLedger(200)));
        assert!(ledger.squashes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_range_is_an_error() {
        let dir = tempdir().unwrap();
        let ledger = MemLedger::with_applied(&[]);

        let err = squash(&dir, &ledger, "100", "300").await.unwrap_err();
        assert!(matches!(err, MigrationError::EmptySquash));
    }

    #[tokio::test]
    async fn rejects_unparseable_bounds() {
        let dir = tempdir().unwrap();
        let ledger = MemLedger::with_applied(&[]);

        let err = squash(&dir, &ledger, "not a time", "300").await.unwrap_err();
        assert!(matches!(err, MigrationError::ParseTime(_)));
    }
}
