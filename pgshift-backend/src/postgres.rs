use crate::generic::{ExecutionContext, Ledger, LedgerError};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration;

const TABLE_NAME: &str = "__pg_mig_meta";

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_BACKOFF: Duration = Duration::from_secs(3);

/// Postgres-backed ledger. One row per applied migration, keyed by its
/// timestamp stored as `timestamptz`.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Connects with a bounded retry; the last connect error propagates.
    pub async fn connect(url: &str) -> Result<Self, LedgerError> {
        let options = PgPoolOptions::new().max_connections(1);

        let mut attempt = 0;
        let pool = loop {
            match options.clone().connect(url).await {
                Ok(pool) => break pool,
                Err(err) => {
                    attempt += 1;
                    if attempt >= CONNECT_ATTEMPTS {
                        return Err(err.into());
                    }
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
            }
        };

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_datetime(ts: i64) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::from_timestamp(ts, 0).ok_or(LedgerError::InvalidTimestamp(ts))
}

#[async_trait::async_trait]
impl Ledger for PgLedger {
    fn table_name(&self) -> &str {
        TABLE_NAME
    }

    async fn ensure(&self) -> Result<(), LedgerError> {
        let ddl = format!(
            "create table if not exists {} (id serial primary key, ts timestamptz not null)",
            self.table_name()
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<i64>, LedgerError> {
        let query = format!("select ts from {} order by ts asc", self.table_name());
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| Ok(row.try_get::<DateTime<Utc>, _>("ts")?.timestamp()))
            .collect()
    }

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LedgerError> {
        let ts = to_datetime(ctx.timestamp)?;
        let mut tx = self.pool.begin().await?;

        let row_mutation = if ctx.is_up {
            format!("insert into {} (ts) values ($1)", self.table_name())
        } else {
            format!("delete from {} where ts = $1", self.table_name())
        };
        sqlx::query(&row_mutation)
            .bind(ts)
            .execute(&mut *tx)
            .await?;

        // The migration body is opaque user SQL and may hold several
        // statements, so it goes through the simple query protocol.
        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&ctx.sql))
            .await
            .map_err(|source| LedgerError::Execution {
                name: ctx.name.clone(),
                source,
            })?;

        if let Err(err) = tx.commit().await {
            // Both steps succeeded but the commit did not; the store's
            // durability guarantee is broken and there is no local way back
            // to a known-good state.
            panic!("ledger commit failed after successful execution: {err}");
        }

        Ok(())
    }

    async fn squash_range(&self, from: i64, to: i64) -> Result<(), LedgerError> {
        let from_ts = to_datetime(from)?;
        let to_ts = to_datetime(to)?;
        let mut tx = self.pool.begin().await?;

        let delete = format!("delete from {} where ts >= $1 and ts <= $2", self.table_name());
        sqlx::query(&delete)
            .bind(from_ts)
            .bind(to_ts)
            .execute(&mut *tx)
            .await?;

        let insert = format!("insert into {} (ts) values ($1)", self.table_name());
        sqlx::query(&insert).bind(to_ts).execute(&mut *tx).await?;

        if let Err(err) = tx.commit().await {
            panic!("ledger commit failed while squashing: {err}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_conversion_round_trips() {
        let ts = 1_600_603_205;
        assert_eq!(to_datetime(ts).unwrap().timestamp(), ts);
    }

    #[test]
    fn datetime_conversion_rejects_out_of_range() {
        assert!(matches!(
            to_datetime(i64::MAX),
            Err(LedgerError::InvalidTimestamp(_))
        ));
    }
}
