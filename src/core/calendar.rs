#![forbid(unsafe_code)]

use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

use crate::error::TreatlogError;

const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Weekday headers in grid order (Monday first).
pub const WEEKDAY_HEADERS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Current calendar date in the local timezone.
///
/// `time` refuses to read the local offset in some multi-threaded or sandboxed
/// environments; UTC is used then.
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

pub fn parse_date(input: &str) -> Result<Date, TreatlogError> {
    Date::parse(input.trim(), DATE_FORMAT)
        .map_err(|_| TreatlogError::InvalidDate(input.to_owned()))
}

#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// Parses `YYYY-MM` into a year and month.
pub fn parse_month(input: &str) -> Result<(i32, Month), TreatlogError> {
    let err = || TreatlogError::InvalidMonth(input.to_owned());
    let (y, m) = input.trim().split_once('-').ok_or_else(err)?;
    if y.len() != 4 || m.is_empty() || m.len() > 2 {
        return Err(err());
    }
    let year: i32 = y.parse().map_err(|_| err())?;
    let month: u8 = m.parse().map_err(|_| err())?;
    let month = Month::try_from(month).map_err(|_| err())?;
    Ok((year, month))
}

#[must_use]
pub fn format_month(year: i32, month: Month) -> String {
    format!("{year:04}-{:02}", u8::from(month))
}

/// Every date of the given month, in order.
#[must_use]
pub fn month_days(year: i32, month: Month) -> Vec<Date> {
    let Ok(mut cur) = Date::from_calendar_date(year, month, 1) else {
        return Vec::new();
    };
    let mut days = Vec::with_capacity(31);
    loop {
        days.push(cur);
        match cur.next_day() {
            Some(next) if next.month() == month => cur = next,
            _ => break,
        }
    }
    days
}

/// Monday-first weeks covering the month. Cells outside the month are `None`.
#[must_use]
pub fn month_grid(year: i32, month: Month) -> Vec<[Option<Date>; 7]> {
    let mut weeks = Vec::new();
    let mut week: [Option<Date>; 7] = [None; 7];
    for day in month_days(year, month) {
        let col = usize::from(day.weekday().number_days_from_monday());
        week[col] = Some(day);
        if col == 6 {
            weeks.push(week);
            week = [None; 7];
        }
    }
    if week.iter().any(Option::is_some) {
        weeks.push(week);
    }
    weeks
}

/// Moves `delta` months forward (or backward when negative).
#[must_use]
pub fn shift_month(year: i32, month: Month, delta: i32) -> (i32, Month) {
    let zero_based = year * 12 + i32::from(u8::from(month)) - 1 + delta;
    let y = zero_based.div_euclid(12);
    let m = u8::try_from(zero_based.rem_euclid(12) + 1).unwrap_or(1);
    (y, Month::try_from(m).unwrap_or(Month::January))
}

/// Same day-of-month in the shifted month, clamped to its last day.
#[must_use]
pub fn shift_date_by_months(date: Date, delta: i32) -> Date {
    let (y, m) = shift_month(date.year(), date.month(), delta);
    let days = month_days(y, m);
    let idx = usize::from(date.day()).min(days.len()).saturating_sub(1);
    days.get(idx).copied().unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn parses_and_formats_iso_dates() {
        let d = parse_date("2024-03-06").unwrap();
        assert_eq!(d, date!(2024 - 03 - 06));
        assert_eq!(format_date(d), "2024-03-06");
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("06/03/2024").is_err());
    }

    #[test]
    fn parses_months() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, Month::February));
        assert_eq!(parse_month("2024-2").unwrap(), (2024, Month::February));
        assert!(parse_month("2024-00").is_err());
        assert!(parse_month("24-02").is_err());
        assert_eq!(format_month(2024, Month::February), "2024-02");
    }

    #[test]
    fn month_days_handles_leap_years() {
        assert_eq!(month_days(2024, Month::February).len(), 29);
        assert_eq!(month_days(2023, Month::February).len(), 28);
        assert_eq!(month_days(2024, Month::December).len(), 31);
    }

    #[test]
    fn month_grid_is_monday_first() {
        // 2024-05-01 is a Wednesday.
        let grid = month_grid(2024, Month::May);
        assert_eq!(grid[0][0], None);
        assert_eq!(grid[0][1], None);
        assert_eq!(grid[0][2], Some(date!(2024 - 05 - 01)));
        assert_eq!(grid.len(), 5);
        let cells: usize = grid.iter().flatten().filter(|c| c.is_some()).count();
        assert_eq!(cells, 31);
    }

    #[test]
    fn shift_month_wraps_years() {
        assert_eq!(shift_month(2024, Month::January, -1), (2023, Month::December));
        assert_eq!(shift_month(2024, Month::December, 1), (2025, Month::January));
        assert_eq!(shift_month(2024, Month::March, 0), (2024, Month::March));
        assert_eq!(
            shift_date_by_months(date!(2024 - 01 - 31), 1),
            date!(2024 - 02 - 29)
        );
    }
}
