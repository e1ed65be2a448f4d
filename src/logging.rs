#![forbid(unsafe_code)]

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::Config;

/// Overrides `log.level` when set.
pub const LOG_ENV: &str = "TREATLOG_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Stderr,
    /// The terminal belongs to the TUI; only a configured log file receives output.
    Quiet,
}

pub fn init(cfg: &Config, sink: Sink) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(cfg.log.level.trim())
            .with_context(|| format!("invalid log.level '{}'", cfg.log.level))?,
    };

    if let Some(path) = cfg.log_file()? {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        return install(filter, std::sync::Mutex::new(file), false);
    }

    match sink {
        Sink::Stderr => install(filter, std::io::stderr, true),
        Sink::Quiet => install(filter, std::io::sink, false),
    }
}

fn install<W>(filter: EnvFilter, writer: W, ansi: bool) -> anyhow::Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}
