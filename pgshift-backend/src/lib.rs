pub mod generic;

mod postgres;

pub use postgres::PgLedger;
