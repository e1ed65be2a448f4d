#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use time::Date;
use tracing::{debug, info, warn};

use crate::core::calendar;
use crate::error::TreatlogError;
use crate::store::log::{CompletionLog, CompletionRecord, UpsertOutcome};
use crate::store::CompletionStore;

pub const HEADER: [&str; 3] = ["Fecha", "Tratamiento", "Realizado"];

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Fecha")]
    date: String,
    #[serde(rename = "Tratamiento")]
    task: String,
    #[serde(rename = "Realizado")]
    done: String,
}

/// Completion log kept as a three-column CSV file, rewritten whole on every write.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<(), TreatlogError> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(parent).map_err(|source| TreatlogError::IoPath {
            path: parent.to_path_buf(),
            source,
        })
    }

    fn read(&self) -> anyhow::Result<CompletionLog> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        let mut rows = Vec::new();
        for (i, row) in rdr.deserialize::<Row>().enumerate() {
            let row = row.with_context(|| format!("bad row {} in {}", i + 1, self.path.display()))?;
            rows.push(parse_row(&row).with_context(|| {
                format!("bad row {} in {}", i + 1, self.path.display())
            })?);
        }
        Ok(CompletionLog::from_records(rows))
    }

    /// Replaces the file with `log`, via a temporary sibling renamed into place.
    pub fn save(&self, log: &CompletionLog) -> anyhow::Result<()> {
        self.ensure_parent()?;
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            wtr.write_record(HEADER)?;
            for r in log.records() {
                wtr.write_record([
                    calendar::format_date(r.date).as_str(),
                    r.task.as_str(),
                    format_bool(r.done),
                ])?;
            }
            wtr.flush()
                .with_context(|| format!("failed to write {}", tmp.display()))?;
        }
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!("failed to rename {} -> {}", tmp.display(), self.path.display())
        })?;
        Ok(())
    }
}

impl CompletionStore for CsvStore {
    fn load(&self) -> CompletionLog {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no completion log yet");
            return CompletionLog::new();
        }
        match self.read() {
            Ok(log) => log,
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable completion log: {e:#}");
                CompletionLog::new()
            }
        }
    }

    fn upsert(&mut self, date: Date, task: &str, done: bool) -> anyhow::Result<UpsertOutcome> {
        let mut log = self.load();
        let outcome = log.upsert(date, task, done);
        if outcome == UpsertOutcome::Unchanged && self.path.exists() {
            debug!(%date, task, done, "completion unchanged");
            return Ok(outcome);
        }
        self.save(&log)?;
        info!(%date, task, done, ?outcome, "completion saved");
        Ok(outcome)
    }
}

fn parse_row(row: &Row) -> anyhow::Result<CompletionRecord> {
    // Tolerate a time component after the date.
    let date_part = row
        .date
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    let date = calendar::parse_date(date_part)?;
    if row.task.is_empty() {
        anyhow::bail!("empty treatment name");
    }
    let done = parse_bool(&row.done)?;
    Ok(CompletionRecord {
        date,
        task: row.task.clone(),
        done,
    })
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{other}'"),
    }
}

fn format_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}
