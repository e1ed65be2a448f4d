#![forbid(unsafe_code)]

use serde::Serialize;
use time::Date;

/// A treatment scheduled for a day. `name` is unique within one day's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Treatment {
    pub name: &'static str,
    pub description: &'static str,
}

/// Set of weekdays as a 7-bit mask, bit 0 = Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Builds a set from weekday indices (0 = Monday .. 6 = Sunday).
    #[must_use]
    pub const fn of(days: &[u8]) -> Self {
        let mut mask = 0u8;
        let mut i = 0;
        while i < days.len() {
            if days[i] < 7 {
                mask |= 1 << days[i];
            }
            i += 1;
        }
        WeekdaySet(mask)
    }

    #[must_use]
    pub const fn contains(self, index: u8) -> bool {
        index < 7 && self.0 & (1 << index) != 0
    }
}

const MON: u8 = 0;
const TUE: u8 = 1;
const WED: u8 = 2;
const THU: u8 = 3;
const FRI: u8 = 4;
const SAT: u8 = 5;
const SUN: u8 = 6;

const WORKOUT_LABELS: [&str; 7] = [
    "Lower body strength",
    "Upper body push",
    "Shoulder-prevention day",
    "Lower body + core",
    "Upper body pull",
    "Mobility & cardio",
    "Total Rest",
];

const FALLBACK_WORKOUT: &str = "Rest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recurrence {
    Daily,
    Weekly(WeekdaySet),
}

impl Recurrence {
    const fn matches(self, index: u8) -> bool {
        match self {
            Recurrence::Daily => true,
            Recurrence::Weekly(days) => days.contains(index),
        }
    }
}

/// Emission order is display order.
const RULES: [(Recurrence, Treatment); 6] = [
    (
        Recurrence::Weekly(WeekdaySet::of(&[MON, TUE, THU, FRI])),
        Treatment {
            name: "Fat",
            description: "Abdominal session before the workout, 10 min",
        },
    ),
    (
        Recurrence::Weekly(WeekdaySet::of(&[MON, WED, FRI])),
        Treatment {
            name: "Elbows",
            description: "Afternoon session, 10 min per elbow",
        },
    ),
    (
        Recurrence::Weekly(WeekdaySet::of(&[THU, SAT])),
        Treatment {
            name: "Knee",
            description: "Right after the workout, 10 min",
        },
    ),
    (
        Recurrence::Weekly(WeekdaySet::of(&[WED])),
        Treatment {
            name: "Shoulder",
            description: "Before the resistance-band routine, 10 min",
        },
    ),
    (
        Recurrence::Weekly(WeekdaySet::of(&[TUE, FRI, SUN])),
        Treatment {
            name: "Brain",
            description: "Morning near-infrared session, 20 min",
        },
    ),
    (
        Recurrence::Daily,
        Treatment {
            name: "Sleep",
            description: "Red-light routine in the evening, 15 min before bed",
        },
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub date: Date,
    pub workout: &'static str,
    pub tasks: Vec<Treatment>,
}

impl Schedule {
    #[must_use]
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name).collect()
    }
}

/// Weekday index of `date`, 0 = Monday .. 6 = Sunday.
#[must_use]
pub fn weekday_index(date: Date) -> u8 {
    date.weekday().number_days_from_monday()
}

#[must_use]
pub fn workout_label(index: u8) -> &'static str {
    WORKOUT_LABELS
        .get(usize::from(index))
        .copied()
        .unwrap_or(FALLBACK_WORKOUT)
}

/// Treatments for a weekday index, in rule order. Out-of-range indices only match
/// daily rules.
#[must_use]
pub fn treatments_for_index(index: u8) -> Vec<Treatment> {
    RULES
        .iter()
        .filter(|(when, _)| when.matches(index))
        .map(|(_, t)| *t)
        .collect()
}

#[must_use]
pub fn derive_schedule(date: Date) -> Schedule {
    let index = weekday_index(date);
    Schedule {
        date,
        workout: workout_label(index),
        tasks: treatments_for_index(index),
    }
}

/// Every distinct treatment, in rule order.
#[must_use]
pub fn all_treatments() -> Vec<Treatment> {
    RULES.iter().map(|(_, t)| *t).collect()
}

/// Weekday indices on which `name` is scheduled.
#[must_use]
pub fn weekdays_for(name: &str) -> Vec<u8> {
    RULES
        .iter()
        .filter(|(_, t)| t.name.eq_ignore_ascii_case(name))
        .flat_map(|(when, _)| (0..7).filter(move |i| when.matches(*i)))
        .collect()
}

/// Resolves a user-typed name against the day's schedule, ignoring case.
#[must_use]
pub fn find_treatment(schedule: &Schedule, name: &str) -> Option<Treatment> {
    let needle = name.trim();
    schedule
        .tasks
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(needle))
        .copied()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn names(index: u8) -> Vec<&'static str> {
        treatments_for_index(index).iter().map(|t| t.name).collect()
    }

    #[test]
    fn weekly_table_matches_rules() {
        assert_eq!(names(MON), ["Fat", "Elbows", "Sleep"]);
        assert_eq!(names(TUE), ["Fat", "Brain", "Sleep"]);
        assert_eq!(names(WED), ["Elbows", "Shoulder", "Sleep"]);
        assert_eq!(names(THU), ["Fat", "Knee", "Sleep"]);
        assert_eq!(names(FRI), ["Fat", "Elbows", "Brain", "Sleep"]);
        assert_eq!(names(SAT), ["Knee", "Sleep"]);
        assert_eq!(names(SUN), ["Brain", "Sleep"]);
    }

    #[test]
    fn sleep_is_always_last_and_present() {
        for i in 0..7 {
            let tasks = treatments_for_index(i);
            assert_eq!(tasks.last().map(|t| t.name), Some("Sleep"));
        }
    }

    #[test]
    fn out_of_range_index_falls_back_to_rest() {
        assert_eq!(workout_label(7), "Rest");
        assert_eq!(workout_label(200), "Rest");
        assert_eq!(names(9), ["Sleep"]);
    }

    #[test]
    fn wednesday_schedule() {
        // 2024-03-06 is a Wednesday.
        let s = derive_schedule(date!(2024 - 03 - 06));
        assert_eq!(s.workout, "Shoulder-prevention day");
        assert_eq!(s.task_names(), ["Elbows", "Shoulder", "Sleep"]);
    }

    #[test]
    fn sunday_is_total_rest() {
        let s = derive_schedule(date!(2024 - 03 - 10));
        assert_eq!(s.workout, "Total Rest");
        assert_eq!(s.task_names(), ["Brain", "Sleep"]);
    }

    #[test]
    fn derivation_depends_only_on_weekday() {
        let a = derive_schedule(date!(2024 - 03 - 04));
        let b = derive_schedule(date!(2025 - 12 - 29));
        assert_eq!(a.workout, b.workout);
        assert_eq!(a.tasks, b.tasks);
    }

    #[test]
    fn find_treatment_ignores_case() {
        let s = derive_schedule(date!(2024 - 03 - 06));
        assert_eq!(find_treatment(&s, "shoulder").map(|t| t.name), Some("Shoulder"));
        assert_eq!(find_treatment(&s, " SLEEP ").map(|t| t.name), Some("Sleep"));
        assert!(find_treatment(&s, "Knee").is_none());
    }

    #[test]
    fn weekdays_for_lists_rule_days() {
        assert_eq!(weekdays_for("fat"), [MON, TUE, THU, FRI]);
        assert_eq!(weekdays_for("Sleep"), [0, 1, 2, 3, 4, 5, 6]);
        assert!(weekdays_for("Nope").is_empty());
    }
}
