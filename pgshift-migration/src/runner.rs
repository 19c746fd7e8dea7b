use crate::{
    MigrationError,
    catalog::{Catalog, Direction, MigrationFile},
    printer::Printer,
    timer::{Target, Timer},
};
use pgshift_backend::generic::{ExecutionContext, Ledger};

/// Plans and drives one run: every catalog migration at or before the
/// target is applied, every ledger entry after it is reverted. Stateless;
/// built per invocation.
pub struct Runner<'a> {
    pub catalog: &'a dyn Catalog,
    pub ledger: &'a dyn Ledger,
    pub printer: &'a dyn Printer,
    pub timer: &'a Timer,
    pub dry_run: bool,
}

/// Ledger entries past the border, in reverse application order.
fn down_candidates(in_db: &[i64], border: i64) -> Vec<i64> {
    in_db.iter().rev().copied().filter(|ts| *ts > border).collect()
}

impl Runner<'_> {
    pub async fn run(&self, input: &str) -> Result<(), MigrationError> {
        let in_db = self.ledger.list().await?;
        let target = self.timer.target(input)?;
        let border = self.resolve_border(&target, &in_db).await?;
        let now = (self.timer.now)().timestamp();

        let stay = self.catalog.between(0, border).await?;
        let go_down = self.catalog.between(border, now).await?;

        self.execute_up(&stay, &in_db).await?;
        self.execute_down(&go_down, &down_candidates(&in_db, border))
            .await
    }

    async fn resolve_border(
        &self,
        target: &Target,
        in_db: &[i64],
    ) -> Result<i64, MigrationError> {
        match target {
            Target::Now => Ok((self.timer.now)().timestamp()),
            Target::Explicit(at) => Ok(at.timestamp()),
            // One second before the latest applied migration, so that
            // migration falls past the border and gets reverted.
            Target::Pop => in_db
                .last()
                .map(|last| last - 1)
                .ok_or(MigrationError::PopExhausted),
            Target::Push => {
                let last = in_db.last().copied().unwrap_or(0);
                let now = (self.timer.now)().timestamp();
                let pending = self.catalog.between(last, now).await?;
                pending
                    .first()
                    .map(|file| file.timestamp)
                    .ok_or(MigrationError::PushExhausted(last))
            }
        }
    }

    async fn execute_up(
        &self,
        stay: &[MigrationFile],
        in_db: &[i64],
    ) -> Result<(), MigrationError> {
        for file in stay {
            if in_db.binary_search(&file.timestamp).is_ok() {
                continue;
            }

            let name = file
                .name(Direction::Up)
                .ok_or(MigrationError::IncompletePair(file.timestamp))?
                .to_string();
            let sql = self.catalog.read_content(file, Direction::Up).await?;

            self.printer.print_up(&name);
            if self.dry_run {
                continue;
            }

            self.ledger
                .apply(&ExecutionContext {
                    timestamp: file.timestamp,
                    sql,
                    name,
                    is_up: true,
                })
                .await?;
        }

        Ok(())
    }

    async fn execute_down(
        &self,
        go_down: &[MigrationFile],
        down_ids: &[i64],
    ) -> Result<(), MigrationError> {
        for &timestamp in down_ids {
            let file = go_down
                .iter()
                .find(|file| file.timestamp == timestamp)
                .ok_or(MigrationError::MissingDownFile(timestamp))?;

            let name = file
                .name(Direction::Down)
                .ok_or(MigrationError::IncompletePair(timestamp))?
                .to_string();
            let sql = self.catalog.read_content(file, Direction::Down).await?;

            self.printer.print_down(&name);
            if self.dry_run {
                continue;
            }

            self.ledger
                .apply(&ExecutionContext {
                    timestamp,
                    sql,
                    name,
                    is_up: false,
                })
                .await?;
        }

        Ok(())
    }
}
