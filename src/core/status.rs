#![forbid(unsafe_code)]

use serde::Serialize;
use time::{Date, Month};

use crate::core::calendar;
use crate::core::schedule::{self, Schedule};
use crate::store::CompletionLog;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// No treatments scheduled.
    Empty,
    NoneDonePast,
    NoneDoneUpcoming,
    Partial,
    Complete,
}

impl DayStatus {
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            DayStatus::Empty => "⚪",
            DayStatus::NoneDonePast => "❌",
            DayStatus::NoneDoneUpcoming => "⬜",
            DayStatus::Partial => "🟡",
            DayStatus::Complete => "✅",
        }
    }

    #[must_use]
    pub fn ascii(self) -> &'static str {
        match self {
            DayStatus::Empty => ".",
            DayStatus::NoneDonePast => "x",
            DayStatus::NoneDoneUpcoming => "-",
            DayStatus::Partial => "~",
            DayStatus::Complete => "#",
        }
    }

    #[must_use]
    pub fn symbol(self, icons: bool) -> &'static str {
        if icons { self.glyph() } else { self.ascii() }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DayStatus::Empty => "nothing scheduled",
            DayStatus::NoneDonePast => "missed",
            DayStatus::NoneDoneUpcoming => "pending",
            DayStatus::Partial => "partial",
            DayStatus::Complete => "complete",
        }
    }

    pub const ALL: [DayStatus; 5] = [
        DayStatus::Complete,
        DayStatus::Partial,
        DayStatus::NoneDoneUpcoming,
        DayStatus::NoneDonePast,
        DayStatus::Empty,
    ];
}

/// Status from counts alone. A done count at or above the theoretical count is
/// `Complete`.
#[must_use]
pub fn classify(theoretical: usize, done: usize, date: Date, today: Date) -> DayStatus {
    if theoretical == 0 {
        return DayStatus::Empty;
    }
    if done == 0 {
        return if date < today {
            DayStatus::NoneDonePast
        } else {
            DayStatus::NoneDoneUpcoming
        };
    }
    if done < theoretical {
        DayStatus::Partial
    } else {
        DayStatus::Complete
    }
}

#[must_use]
pub fn task_done_state(log: &CompletionLog, date: Date, task: &str) -> bool {
    log.is_done(date, task)
}

/// Compares the day's theoretical treatment count with its done records.
///
/// The done count is not restricted to treatments scheduled that day, so a record
/// for a name no longer in the weekly table still counts.
#[must_use]
pub fn day_status(log: &CompletionLog, date: Date, today: Date) -> DayStatus {
    let theoretical = schedule::derive_schedule(date).tasks.len();
    classify(theoretical, log.done_count(date), date, today)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskView {
    pub name: &'static str,
    pub description: &'static str,
    pub done: bool,
}

/// One date's schedule joined with the completion log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub schedule: Schedule,
    pub tasks: Vec<TaskView>,
    pub done: usize,
    pub status: DayStatus,
}

impl DayView {
    #[must_use]
    pub fn date(&self) -> Date {
        self.schedule.date
    }

    #[must_use]
    pub fn workout(&self) -> &'static str {
        self.schedule.workout
    }
}

#[must_use]
pub fn day_view(log: &CompletionLog, date: Date, today: Date) -> DayView {
    let schedule = schedule::derive_schedule(date);
    let tasks = schedule
        .tasks
        .iter()
        .map(|t| TaskView {
            name: t.name,
            description: t.description,
            done: task_done_state(log, date, t.name),
        })
        .collect();
    let done = log.done_count(date);
    let status = classify(schedule.tasks.len(), done, date, today);
    DayView {
        schedule,
        tasks,
        done,
        status,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub date: Date,
    pub theoretical: usize,
    pub done: usize,
    pub status: DayStatus,
}

#[must_use]
pub fn day_summary(log: &CompletionLog, date: Date, today: Date) -> DaySummary {
    let theoretical = schedule::derive_schedule(date).tasks.len();
    let done = log.done_count(date);
    DaySummary {
        date,
        theoretical,
        done,
        status: classify(theoretical, done, date, today),
    }
}

/// Summary of every day in the month, in date order.
#[must_use]
pub fn month_view(log: &CompletionLog, year: i32, month: Month, today: Date) -> Vec<DaySummary> {
    calendar::month_days(year, month)
        .into_iter()
        .map(|d| day_summary(log, d, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    const WED: Date = date!(2024 - 03 - 06);

    #[test]
    fn zero_theoretical_is_empty_regardless_of_log() {
        assert_eq!(classify(0, 0, WED, WED), DayStatus::Empty);
        assert_eq!(classify(0, 4, WED, WED), DayStatus::Empty);
    }

    #[test]
    fn none_done_splits_on_today() {
        let yesterday = date!(2024 - 03 - 05);
        let tomorrow = date!(2024 - 03 - 07);
        assert_eq!(classify(3, 0, yesterday, WED), DayStatus::NoneDonePast);
        assert_eq!(classify(3, 0, WED, WED), DayStatus::NoneDoneUpcoming);
        assert_eq!(classify(3, 0, tomorrow, WED), DayStatus::NoneDoneUpcoming);
    }

    #[test]
    fn transitions_for_three_tasks() {
        assert_eq!(classify(3, 1, WED, WED), DayStatus::Partial);
        assert_eq!(classify(3, 2, WED, WED), DayStatus::Partial);
        assert_eq!(classify(3, 3, WED, WED), DayStatus::Complete);
    }

    #[test]
    fn wednesday_two_of_three_is_partial() {
        let mut log = CompletionLog::new();
        log.upsert(WED, "Elbows", true);
        log.upsert(WED, "Shoulder", true);

        let view = day_view(&log, WED, WED);
        assert_eq!(view.workout(), "Shoulder-prevention day");
        assert_eq!(view.done, 2);
        assert_eq!(view.status, DayStatus::Partial);
        let done: Vec<bool> = view.tasks.iter().map(|t| t.done).collect();
        assert_eq!(done, [true, true, false]);

        log.upsert(WED, "Sleep", true);
        assert_eq!(day_status(&log, WED, WED), DayStatus::Complete);
    }

    #[test]
    fn undone_records_do_not_count() {
        let mut log = CompletionLog::new();
        log.upsert(WED, "Elbows", false);
        assert_eq!(
            day_status(&log, WED, date!(2024 - 03 - 08)),
            DayStatus::NoneDonePast
        );
        assert!(!task_done_state(&log, WED, "Elbows"));
    }

    #[test]
    fn stale_task_names_inflate_the_count() {
        let mut log = CompletionLog::new();
        log.upsert(WED, "Knee", true);
        log.upsert(WED, "Fat", true);
        log.upsert(WED, "Brain", true);
        assert_eq!(day_status(&log, WED, WED), DayStatus::Complete);
    }

    #[test]
    fn month_view_covers_each_day() {
        let mut log = CompletionLog::new();
        log.upsert(WED, "Sleep", true);
        let days = month_view(&log, 2024, Month::March, date!(2024 - 03 - 10));
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].status, DayStatus::NoneDonePast);
        assert_eq!(days[5].date, WED);
        assert_eq!(days[5].status, DayStatus::Partial);
        assert_eq!(days[9].status, DayStatus::NoneDoneUpcoming);
        assert!(days.iter().all(|d| d.theoretical > 0));
    }
}
