#![forbid(unsafe_code)]

pub mod csv_store;
pub mod log;

use time::Date;

pub use self::csv_store::CsvStore;
pub use self::log::{CompletionLog, CompletionRecord, UpsertOutcome};

/// Durable (date, task) -> done mapping.
pub trait CompletionStore {
    /// Full read of the log. Missing or unreadable storage yields an empty log.
    fn load(&self) -> CompletionLog;

    /// Writes or overwrites the record for (date, task).
    fn upsert(&mut self, date: Date, task: &str, done: bool) -> anyhow::Result<UpsertOutcome>;
}
