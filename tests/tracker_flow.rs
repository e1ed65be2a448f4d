use time::Date;
use time::macros::date;

use treatlog::config::{self, StartTab};
use treatlog::core::schedule;
use treatlog::core::status::{self, DayStatus};
use treatlog::store::{CompletionStore, CsvStore, UpsertOutcome};

const WED: Date = date!(2024 - 03 - 06);

fn store_in(dir: &tempfile::TempDir) -> CsvStore {
    CsvStore::new(dir.path().join("data").join("treatments.csv"))
}

#[test]
fn wednesday_marked_across_sessions() {
    let td = tempfile::tempdir().expect("tempdir");

    let sched = schedule::derive_schedule(WED);
    assert_eq!(sched.workout, "Shoulder-prevention day");
    assert_eq!(sched.task_names(), ["Elbows", "Shoulder", "Sleep"]);

    {
        let mut store = store_in(&td);
        store.upsert(WED, "Elbows", true).expect("mark elbows");
        store.upsert(WED, "Shoulder", true).expect("mark shoulder");
    }

    // A fresh handle sees only what was persisted.
    let mut store = store_in(&td);
    let view = status::day_view(&store.load(), WED, WED);
    assert_eq!(view.status, DayStatus::Partial);
    assert_eq!(view.done, 2);

    store.upsert(WED, "Sleep", true).expect("mark sleep");
    assert_eq!(
        status::day_status(&store.load(), WED, WED),
        DayStatus::Complete
    );
}

#[test]
fn upsert_is_idempotent_and_overwrites() {
    let td = tempfile::tempdir().expect("tempdir");
    let mut store = store_in(&td);

    assert_eq!(store.upsert(WED, "Elbows", true).unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.upsert(WED, "Elbows", true).unwrap(), UpsertOutcome::Unchanged);
    assert_eq!(store.upsert(WED, "Elbows", false).unwrap(), UpsertOutcome::Updated);

    let log = store.load();
    assert_eq!(log.len(), 1);
    assert!(!log.is_done(WED, "Elbows"));
    assert_eq!(
        status::day_status(&log, WED, date!(2024 - 03 - 07)),
        DayStatus::NoneDonePast
    );
}

#[test]
fn every_record_survives_reload_regardless_of_write_order() {
    let td = tempfile::tempdir().expect("tempdir");
    let mut store = store_in(&td);

    let writes = [
        (date!(2024 - 03 - 08), "Brain", true),
        (date!(2024 - 03 - 04), "Fat", false),
        (date!(2024 - 03 - 06), "Sleep", true),
        (date!(2024 - 03 - 04), "Elbows", true),
        (date!(2024 - 03 - 10), "Sleep", false),
    ];
    for (d, task, done) in writes {
        store.upsert(d, task, done).expect("upsert");
    }

    let log = store.load();
    assert_eq!(log.len(), writes.len());
    for (d, task, done) in writes {
        assert_eq!(log.is_done(d, task), done, "{d} {task}");
    }
}

#[test]
fn corrupt_log_reads_empty_and_is_replaced_on_write() {
    let td = tempfile::tempdir().expect("tempdir");
    let mut store = store_in(&td);
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "\u{0}\u{1}garbage\n,,,,\n").unwrap();

    assert!(store.load().is_empty());

    store.upsert(WED, "Sleep", true).expect("upsert over corrupt file");
    let log = store.load();
    assert_eq!(log.len(), 1);
    assert!(log.is_done(WED, "Sleep"));
}

#[test]
fn every_weekday_has_a_workout_and_sleep() {
    // 2024-03-04 is a Monday.
    let monday = date!(2024 - 03 - 04);
    let expected = [
        ("Lower body strength", 3),
        ("Upper body push", 3),
        ("Shoulder-prevention day", 3),
        ("Lower body + core", 3),
        ("Upper body pull", 4),
        ("Mobility & cardio", 2),
        ("Total Rest", 2),
    ];
    let mut d = monday;
    for (workout, count) in expected {
        let s = schedule::derive_schedule(d);
        assert_eq!(s.workout, workout, "{d}");
        assert_eq!(s.tasks.len(), count, "{d}");
        assert_eq!(s.task_names().last(), Some(&"Sleep"));
        d = d.next_day().unwrap();
    }
}

#[test]
fn config_file_drives_store_location() {
    let td = tempfile::tempdir().expect("tempdir");
    let cfg_path = td.path().join("config.toml");
    let csv_path = td.path().join("custom.csv");

    config::set_value_string_at_path(&cfg_path, "store.path", csv_path.to_str().unwrap())
        .expect("set store.path");
    config::set_value_string_at_path(&cfg_path, "ui.start_tab", "calendar")
        .expect("set ui.start_tab");

    let (_doc, cfg) = config::load_from_file(&cfg_path).expect("load");
    assert_eq!(cfg.ui.start_tab, StartTab::Calendar);
    assert_eq!(cfg.store_path().unwrap(), csv_path);

    let mut store = CsvStore::new(cfg.store_path().unwrap());
    store.upsert(WED, "Shoulder", true).unwrap();
    assert!(csv_path.exists());
}
