#![forbid(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser, Subcommand};
use serde::Serialize;
use time::Date;
use tracing::debug;

use crate::config::{self, Config};
use crate::core::calendar;
use crate::core::schedule;
use crate::core::status::{self, DayStatus, DaySummary, DayView, TaskView};
use crate::error::TreatlogError;
use crate::logging;
use crate::output::table::Table;
use crate::store::{CompletionStore, CsvStore, UpsertOutcome};
use crate::tui;

#[derive(Debug, Parser)]
#[command(
    name = "treatlog",
    version,
    about = "Daily treatment checklist and monthly completion calendar"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the schedule and completion state for a day
    #[command(alias = "today")]
    Day(DayArgs),
    /// Mark a treatment (or every treatment) done or not done
    Mark(MarkArgs),
    /// Flip the done state of a treatment
    Toggle(ToggleArgs),
    /// Show the completion calendar for a month
    Month(MonthArgs),
    /// Show the weekly treatment table
    Schedule(ScheduleArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct DayArgs {
    /// Date (YYYY-MM-DD, today, yesterday, tomorrow)
    pub date: Option<String>,
    /// Output in JSON format
    #[arg(long = "json", conflicts_with = "csv")]
    pub json: bool,
    /// Output as CSV
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct MarkArgs {
    /// Treatment name (case-insensitive)
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub task: Option<String>,
    /// Mark every treatment scheduled for the day
    #[arg(short = 'a', long = "all")]
    pub all: bool,
    /// Date (defaults to today)
    #[arg(short = 'd', long = "date")]
    pub date: Option<String>,
    /// Record as not done
    #[arg(short = 'u', long = "undone")]
    pub undone: bool,
}

#[derive(Debug, Parser)]
pub struct ToggleArgs {
    /// Treatment name (case-insensitive)
    pub task: String,
    /// Date (defaults to today)
    #[arg(short = 'd', long = "date")]
    pub date: Option<String>,
}

#[derive(Debug, Parser)]
pub struct MonthArgs {
    /// Month (YYYY-MM, defaults to the current month)
    pub month: Option<String>,
    /// One JSON object per day
    #[arg(long = "json", conflicts_with = "csv")]
    pub json: bool,
    /// One CSV row per day
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct ScheduleArgs {
    /// Output in JSON format
    #[arg(long = "json")]
    pub json: bool,
    /// One row per treatment with the weekdays it falls on
    #[arg(long = "by-treatment")]
    pub by_treatment: bool,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => cmd_default(),
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "treatlog", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => cmd_config(args),
        Some(Commands::Version) => Ok(cmd_version()),
        Some(Commands::Schedule(args)) => cmd_schedule(&args),
        Some(Commands::Day(args)) => {
            let (cfg, store) = open(logging::Sink::Stderr)?;
            cmd_day(&cfg, &store, &args)
        }
        Some(Commands::Mark(args)) => {
            let (cfg, mut store) = open(logging::Sink::Stderr)?;
            cmd_mark(&cfg, &mut store, &args)
        }
        Some(Commands::Toggle(args)) => {
            let (cfg, mut store) = open(logging::Sink::Stderr)?;
            cmd_toggle(&cfg, &mut store, &args)
        }
        Some(Commands::Month(args)) => {
            let (cfg, store) = open(logging::Sink::Stderr)?;
            cmd_month(&cfg, &store, &args)
        }
    }
}

fn cmd_default() -> anyhow::Result<ExitCode> {
    if !tui::is_tty() {
        // Non-TTY fallback: print today's checklist.
        let (cfg, store) = open(logging::Sink::Stderr)?;
        let args = DayArgs {
            date: None,
            json: false,
            csv: false,
        };
        return cmd_day(&cfg, &store, &args);
    }

    let (cfg, mut store) = open(logging::Sink::Quiet)?;
    tui::app::run(&cfg, &mut store)?;
    Ok(ExitCode::SUCCESS)
}

/// Loads config, installs logging, and opens the store once for this process.
fn open(sink: logging::Sink) -> anyhow::Result<(Config, CsvStore)> {
    let (cfg, paths) = config::load()?;
    if let Err(e) = logging::init(&cfg, sink) {
        eprintln!("warning: logging disabled: {e:#}");
    }
    debug!(config = %paths.config_file.display(), "configuration loaded");
    let path = cfg.store_path()?;
    debug!(store = %path.display(), "using completion log");
    Ok((cfg, CsvStore::new(path)))
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<ExitCode> {
    match args.cmd {
        ConfigCmd::List => {
            print!("{}", config::list_resolved_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Set(set) => {
            config::set_value_string(&set.key, &set.value)?;
            println!("Set {} = {}", set.key, set.value);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
            Some(v) => {
                println!("{v}");
                Ok(ExitCode::SUCCESS)
            }
            None => anyhow::bail!(
                "configuration key '{}' not found - use 'treatlog config list' to see available keys",
                get.key
            ),
        },
    }
}

/// Accepts `YYYY-MM-DD` and the words today, yesterday and tomorrow.
pub fn resolve_date(input: Option<&str>, today: Date) -> Result<Date, TreatlogError> {
    let Some(raw) = input.map(str::trim) else {
        return Ok(today);
    };
    match raw.to_ascii_lowercase().as_str() {
        "" | "today" => Ok(today),
        "yesterday" => today
            .previous_day()
            .ok_or_else(|| TreatlogError::InvalidDate(raw.to_owned())),
        "tomorrow" => today
            .next_day()
            .ok_or_else(|| TreatlogError::InvalidDate(raw.to_owned())),
        _ => calendar::parse_date(raw),
    }
}

#[derive(Debug, Serialize)]
struct DayJson<'a> {
    date: String,
    weekday: String,
    workout: &'static str,
    status: DayStatus,
    done: usize,
    total: usize,
    tasks: &'a [TaskView],
}

impl<'a> DayJson<'a> {
    fn new(view: &'a DayView) -> Self {
        Self {
            date: calendar::format_date(view.date()),
            weekday: view.date().weekday().to_string(),
            workout: view.workout(),
            status: view.status,
            done: view.done,
            total: view.tasks.len(),
            tasks: &view.tasks,
        }
    }
}

fn cmd_day(cfg: &Config, store: &CsvStore, args: &DayArgs) -> anyhow::Result<ExitCode> {
    let today = calendar::today();
    let date = resolve_date(args.date.as_deref(), today)?;
    let log = store.load();
    let view = status::day_view(&log, date, today);

    if args.json {
        let mut s = serde_json::to_string_pretty(&DayJson::new(&view))?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut t = Table::new(["date", "task", "description", "done"]);
    for task in &view.tasks {
        t.row([
            calendar::format_date(date),
            task.name.to_owned(),
            task.description.to_owned(),
            task.done.to_string(),
        ]);
    }
    if args.csv {
        t.print_csv()?;
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", render_day(&view, cfg.ui.icons));
    Ok(ExitCode::SUCCESS)
}

#[must_use]
pub fn render_day(view: &DayView, icons: bool) -> String {
    let mut out = format!(
        "{} {} - {}\n{} {} ({}/{})\n\n",
        view.date().weekday(),
        calendar::format_date(view.date()),
        view.workout(),
        view.status.symbol(icons),
        view.status.label(),
        view.done,
        view.tasks.len()
    );
    let mut t = Table::new(["", "TASK", "DESCRIPTION"]);
    for task in &view.tasks {
        t.row([
            if task.done { "[x]" } else { "[ ]" }.to_owned(),
            task.name.to_owned(),
            task.description.to_owned(),
        ]);
    }
    let mut buf = Vec::new();
    if t.write_to(&mut buf).is_ok() {
        out.push_str(&String::from_utf8_lossy(&buf));
    }
    out
}

fn cmd_mark(cfg: &Config, store: &mut CsvStore, args: &MarkArgs) -> anyhow::Result<ExitCode> {
    let today = calendar::today();
    let date = resolve_date(args.date.as_deref(), today)?;
    let done = !args.undone;
    let day = schedule::derive_schedule(date);

    let names: Vec<&'static str> = if args.all {
        day.task_names()
    } else {
        let wanted = args.task.as_deref().unwrap_or_default();
        vec![resolve_treatment(&day, wanted)?]
    };

    for name in names {
        let outcome = store
            .upsert(date, name, done)
            .with_context(|| format!("failed to record {name} for {date}"))?;
        println!(
            "{} {name} {} for {}",
            outcome_verb(outcome),
            if done { "done" } else { "not done" },
            calendar::format_date(date)
        );
    }

    print_day_status(cfg, store, date, today);
    Ok(ExitCode::SUCCESS)
}

fn cmd_toggle(cfg: &Config, store: &mut CsvStore, args: &ToggleArgs) -> anyhow::Result<ExitCode> {
    let today = calendar::today();
    let date = resolve_date(args.date.as_deref(), today)?;
    let day = schedule::derive_schedule(date);
    let name = resolve_treatment(&day, &args.task)?;

    let done = !store.load().is_done(date, name);
    store
        .upsert(date, name, done)
        .with_context(|| format!("failed to record {name} for {date}"))?;
    println!(
        "{name} is now {} for {}",
        if done { "done" } else { "not done" },
        calendar::format_date(date)
    );

    print_day_status(cfg, store, date, today);
    Ok(ExitCode::SUCCESS)
}

fn resolve_treatment(day: &schedule::Schedule, name: &str) -> Result<&'static str, TreatlogError> {
    schedule::find_treatment(day, name)
        .map(|t| t.name)
        .ok_or_else(|| TreatlogError::UnknownTreatment {
            date: calendar::format_date(day.date),
            name: name.to_owned(),
            scheduled: day.task_names().join(", "),
        })
}

fn outcome_verb(outcome: UpsertOutcome) -> &'static str {
    match outcome {
        UpsertOutcome::Inserted => "Recorded",
        UpsertOutcome::Updated => "Updated",
        UpsertOutcome::Unchanged => "Already",
    }
}

fn print_day_status(cfg: &Config, store: &CsvStore, date: Date, today: Date) {
    let log = store.load();
    let summary = status::day_summary(&log, date, today);
    println!(
        "{} {} ({}/{})",
        summary.status.symbol(cfg.ui.icons),
        summary.status.label(),
        summary.done,
        summary.theoretical
    );
}

#[derive(Debug, Serialize)]
struct DaySummaryJson {
    date: String,
    weekday: String,
    theoretical: usize,
    done: usize,
    status: DayStatus,
}

impl From<&DaySummary> for DaySummaryJson {
    fn from(d: &DaySummary) -> Self {
        Self {
            date: calendar::format_date(d.date),
            weekday: d.date.weekday().to_string(),
            theoretical: d.theoretical,
            done: d.done,
            status: d.status,
        }
    }
}

#[derive(Debug, Serialize)]
struct MonthJson {
    month: String,
    days: Vec<DaySummaryJson>,
}

fn cmd_month(cfg: &Config, store: &CsvStore, args: &MonthArgs) -> anyhow::Result<ExitCode> {
    let today = calendar::today();
    let (year, month) = match args.month.as_deref() {
        Some(m) => calendar::parse_month(m)?,
        None => (today.year(), today.month()),
    };
    let log = store.load();
    let days = status::month_view(&log, year, month, today);

    if args.json {
        let out = MonthJson {
            month: calendar::format_month(year, month),
            days: days.iter().map(DaySummaryJson::from).collect(),
        };
        let mut s = serde_json::to_string_pretty(&out)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    if args.csv {
        let mut t = Table::new(["date", "weekday", "theoretical", "done", "status"]);
        for d in &days {
            let row = DaySummaryJson::from(d);
            t.row([
                row.date,
                row.weekday,
                row.theoretical.to_string(),
                row.done.to_string(),
                status_key(d.status).to_owned(),
            ]);
        }
        t.print_csv()?;
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", render_month(year, month, &days, cfg.ui.icons));
    Ok(ExitCode::SUCCESS)
}

fn status_key(s: DayStatus) -> &'static str {
    match s {
        DayStatus::Empty => "empty",
        DayStatus::NoneDonePast => "none_done_past",
        DayStatus::NoneDoneUpcoming => "none_done_upcoming",
        DayStatus::Partial => "partial",
        DayStatus::Complete => "complete",
    }
}

/// Monday-first text calendar with one status symbol per day, plus a legend.
#[must_use]
pub fn render_month(year: i32, month: time::Month, days: &[DaySummary], icons: bool) -> String {
    // Emoji glyphs occupy two terminal columns.
    let symbol_width = if icons { 2 } else { 1 };
    let cell_width = 3 + symbol_width;

    let mut out = format!("{month} {year}\n");
    let headers: Vec<String> = calendar::WEEKDAY_HEADERS
        .iter()
        .map(|h| format!("{h:<cell_width$}"))
        .collect();
    out.push_str(headers.join(" ").trim_end());
    out.push('\n');

    for week in calendar::month_grid(year, month) {
        let cells: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                Some(date) => {
                    let symbol = days
                        .iter()
                        .find(|d| d.date == *date)
                        .map_or(" ", |d| d.status.symbol(icons));
                    format!("{:>2} {symbol}", date.day())
                }
                None => " ".repeat(cell_width),
            })
            .collect();
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }

    out.push('\n');
    let legend: Vec<String> = DayStatus::ALL
        .iter()
        .map(|s| format!("{} {}", s.symbol(icons), s.label()))
        .collect();
    out.push_str(&legend.join("  "));
    out.push('\n');
    out
}

#[derive(Debug, Serialize)]
struct WeekdayJson {
    weekday: String,
    workout: &'static str,
    tasks: Vec<schedule::Treatment>,
}

#[derive(Debug, Serialize)]
struct TreatmentJson {
    #[serde(flatten)]
    treatment: schedule::Treatment,
    weekdays: Vec<&'static str>,
}

fn cmd_schedule(args: &ScheduleArgs) -> anyhow::Result<ExitCode> {
    if args.by_treatment {
        return cmd_schedule_by_treatment(args.json);
    }

    let week: Vec<WeekdayJson> = (0u8..7)
        .map(|i| WeekdayJson {
            weekday: calendar::WEEKDAY_HEADERS[usize::from(i)].to_owned(),
            workout: schedule::workout_label(i),
            tasks: schedule::treatments_for_index(i),
        })
        .collect();

    if args.json {
        let mut s = serde_json::to_string_pretty(&week)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut t = Table::new(["DAY", "WORKOUT", "TREATMENTS"]);
    for day in &week {
        let names: Vec<&str> = day.tasks.iter().map(|t| t.name).collect();
        t.row([day.weekday.clone(), day.workout.to_owned(), names.join(", ")]);
    }
    t.print()?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_schedule_by_treatment(json: bool) -> anyhow::Result<ExitCode> {
    let rows: Vec<TreatmentJson> = schedule::all_treatments()
        .into_iter()
        .map(|t| TreatmentJson {
            weekdays: schedule::weekdays_for(t.name)
                .into_iter()
                .map(|i| calendar::WEEKDAY_HEADERS[usize::from(i)])
                .collect(),
            treatment: t,
        })
        .collect();

    if json {
        let mut s = serde_json::to_string_pretty(&rows)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut t = Table::new(["TREATMENT", "DAYS", "DESCRIPTION"]);
    for row in &rows {
        t.row([
            row.treatment.name.to_owned(),
            row.weekdays.join(" "),
            row.treatment.description.to_owned(),
        ]);
    }
    t.print()?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_version() -> ExitCode {
    println!("treatlog version {}", env!("CARGO_PKG_VERSION"));
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}
