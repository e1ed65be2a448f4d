#![forbid(unsafe_code)]

use std::collections::HashMap;

use time::Date;

/// Last known done-state of one treatment on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub date: Date,
    pub task: String,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Completion records keyed by (date, task), kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionLog {
    records: Vec<CompletionRecord>,
}

impl CompletionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from raw rows. Repeated (date, task) keys keep the position of
    /// their first row and the value of their last one.
    #[must_use]
    pub fn from_records(rows: impl IntoIterator<Item = CompletionRecord>) -> Self {
        let mut records: Vec<CompletionRecord> = Vec::new();
        let mut index: HashMap<(Date, String), usize> = HashMap::new();
        for row in rows {
            let key = (row.date, row.task.clone());
            if let Some(&i) = index.get(&key) {
                records[i].done = row.done;
            } else {
                index.insert(key, records.len());
                records.push(row);
            }
        }
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[CompletionRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, date: Date, task: &str) -> Option<&CompletionRecord> {
        self.records
            .iter()
            .find(|r| r.date == date && r.task == task)
    }

    /// Unset treatments count as not done.
    #[must_use]
    pub fn is_done(&self, date: Date, task: &str) -> bool {
        self.get(date, task).is_some_and(|r| r.done)
    }

    /// Records for `date` with `done = true`, whatever their task name.
    #[must_use]
    pub fn done_count(&self, date: Date) -> usize {
        self.records
            .iter()
            .filter(|r| r.date == date && r.done)
            .count()
    }

    pub fn records_for(&self, date: Date) -> impl Iterator<Item = &CompletionRecord> {
        self.records.iter().filter(move |r| r.date == date)
    }

    pub fn upsert(&mut self, date: Date, task: &str, done: bool) -> UpsertOutcome {
        if let Some(rec) = self
            .records
            .iter_mut()
            .find(|r| r.date == date && r.task == task)
        {
            if rec.done == done {
                return UpsertOutcome::Unchanged;
            }
            rec.done = done;
            return UpsertOutcome::Updated;
        }
        self.records.push(CompletionRecord {
            date,
            task: task.to_owned(),
            done,
        });
        UpsertOutcome::Inserted
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn rec(date: Date, task: &str, done: bool) -> CompletionRecord {
        CompletionRecord {
            date,
            task: task.to_owned(),
            done,
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let d = date!(2024 - 03 - 06);
        let mut log = CompletionLog::new();
        assert_eq!(log.upsert(d, "Elbows", true), UpsertOutcome::Inserted);
        assert_eq!(log.upsert(d, "Elbows", true), UpsertOutcome::Unchanged);
        assert_eq!(log.len(), 1);
        assert!(log.is_done(d, "Elbows"));
    }

    #[test]
    fn upsert_overwrites_instead_of_duplicating() {
        let d = date!(2024 - 03 - 06);
        let mut log = CompletionLog::new();
        log.upsert(d, "Elbows", true);
        assert_eq!(log.upsert(d, "Elbows", false), UpsertOutcome::Updated);
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(d, "Elbows").map(|r| r.done), Some(false));
    }

    #[test]
    fn keys_are_date_and_task() {
        let mut log = CompletionLog::new();
        log.upsert(date!(2024 - 03 - 06), "Sleep", true);
        log.upsert(date!(2024 - 03 - 07), "Sleep", true);
        log.upsert(date!(2024 - 03 - 06), "Elbows", false);
        assert_eq!(log.len(), 3);
        assert_eq!(log.records_for(date!(2024 - 03 - 06)).count(), 2);
        assert_eq!(log.done_count(date!(2024 - 03 - 06)), 1);
    }

    #[test]
    fn unset_task_is_not_done() {
        let log = CompletionLog::new();
        assert!(!log.is_done(date!(2024 - 03 - 06), "Sleep"));
    }

    #[test]
    fn from_records_collapses_duplicates_last_value_wins() {
        let d = date!(2024 - 03 - 06);
        let log = CompletionLog::from_records([
            rec(d, "Elbows", true),
            rec(d, "Sleep", true),
            rec(d, "Elbows", false),
        ]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0], rec(d, "Elbows", false));
        assert_eq!(log.records()[1], rec(d, "Sleep", true));
    }

    #[test]
    fn done_count_does_not_check_schedule_membership() {
        let d = date!(2024 - 03 - 06);
        let mut log = CompletionLog::new();
        log.upsert(d, "Knee", true);
        log.upsert(d, "Retired treatment", true);
        assert_eq!(log.done_count(d), 2);
    }
}
