use crate::MigrationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub const PUSH: &str = "push";
pub const POP: &str = "pop";

const DATE_NO_TIMEZONE: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_NO_TIME: &str = "%Y-%m-%d";
const ONLY_TIME: &str = "%I:%M%p";

pub type TimeGetter = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Where a run should end up, as parsed from the raw `--time` expression.
/// `Push` and `Pop` are resolved against the ledger by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Now,
    Push,
    Pop,
    Explicit(DateTime<Utc>),
}

/// Clock with an injectable notion of "now", so tests control the current
/// date used by the time-only format.
pub struct Timer {
    pub now: TimeGetter,
}

impl Timer {
    pub fn system() -> Self {
        Self {
            now: Box::new(Utc::now),
        }
    }

    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self {
            now: Box::new(move || at),
        }
    }

    pub fn target(&self, input: &str) -> Result<Target, MigrationError> {
        match input {
            "" => Ok(Target::Now),
            PUSH => Ok(Target::Push),
            POP => Ok(Target::Pop),
            _ => Ok(Target::Explicit(self.parse_time(input)?)),
        }
    }

    /// Tries each supported format in order; the first successful parse
    /// wins. Zoneless formats are read as UTC.
    pub fn parse_time(&self, input: &str) -> Result<DateTime<Utc>, MigrationError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(dt) = NaiveDateTime::parse_from_str(input, DATE_NO_TIMEZONE) {
            return Ok(dt.and_utc());
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, DATE_NO_TIME) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }

        if let Ok(time) = NaiveTime::parse_from_str(input, ONLY_TIME) {
            // Hour, minute and second substituted into today's date.
            let now = (self.now)();
            return Ok(now.date_naive().and_time(time).and_utc());
        }

        if let Ok(ts) = input.parse::<i64>() {
            return DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| MigrationError::ParseTime(input.to_string()));
        }

        Err(MigrationError::ParseTime(input.to_string()))
    }
}
