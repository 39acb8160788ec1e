//! Tests for schedule resolution: exception precedence, validity windows,
//! split shifts, and skipping malformed rows.

use availability_engine::schedule::{
    find_overlapping_schedules, Resolution, ScheduleResolver, UnavailableReason, WorkingInterval,
};
use availability_engine::{ExceptionKind, RecordKind, ScheduleException, WorkSchedule};
use chrono::NaiveDate;

// ── Helpers ─────────────────────────────────────────────────────────────────

const DEFAULT_GRANULARITY: u32 = 10;
const NO_EXCEPTIONS: &[ScheduleException] = &[];

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn schedule(id: &str, provider: &str, day: u8, start: &str, end: &str, granularity: u32) -> WorkSchedule {
    WorkSchedule {
        id: id.to_string(),
        provider_id: provider.to_string(),
        day_of_week: day,
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        slot_granularity_minutes: granularity,
        is_active: true,
        valid_from: None,
        valid_until: None,
    }
}

fn absence(id: &str, provider: &str, on: &str) -> ScheduleException {
    ScheduleException {
        id: id.to_string(),
        provider_id: provider.to_string(),
        date: date(on),
        kind: ExceptionKind::Absence,
        start_time: None,
        end_time: None,
        reason: Some("vacation".to_string()),
    }
}

fn modified(id: &str, provider: &str, on: &str, start: &str, end: &str) -> ScheduleException {
    ScheduleException {
        id: id.to_string(),
        provider_id: provider.to_string(),
        date: date(on),
        kind: ExceptionKind::ModifiedHours,
        start_time: Some(start.parse().unwrap()),
        end_time: Some(end.parse().unwrap()),
        reason: None,
    }
}

fn resolve(schedules: &[WorkSchedule], exceptions: &[ScheduleException], provider: &str, on: &str) -> Resolution {
    ScheduleResolver::new(schedules, exceptions, DEFAULT_GRANULARITY).resolve(provider, date(on))
}

// 2026-03-16 is a Monday (index 0), 2026-03-17 a Tuesday.
const MONDAY: &str = "2026-03-16";
const TUESDAY: &str = "2026-03-17";

// ── Recurring schedule ──────────────────────────────────────────────────────

#[test]
fn weekly_schedule_yields_single_interval() {
    let schedules = vec![schedule("s1", "dr-a", 0, "09:00", "17:00", 15)];
    assert_eq!(
        resolve(&schedules, &[], "dr-a", MONDAY),
        Resolution::Working(vec![WorkingInterval::new(540, 1020, 15)])
    );
}

#[test]
fn day_without_schedule_is_unavailable() {
    let schedules = vec![schedule("s1", "dr-a", 0, "09:00", "17:00", 15)];
    assert_eq!(
        resolve(&schedules, &[], "dr-a", TUESDAY),
        Resolution::Unavailable(UnavailableReason::NoSchedule)
    );
    assert_eq!(
        resolve(&schedules, &[], "dr-unknown", MONDAY),
        Resolution::Unavailable(UnavailableReason::NoSchedule)
    );
}

#[test]
fn split_shifts_return_every_interval_sorted() {
    let schedules = vec![
        schedule("evening", "dr-a", 0, "14:00", "18:00", 30),
        schedule("morning", "dr-a", 0, "08:00", "12:00", 15),
    ];
    assert_eq!(
        resolve(&schedules, &[], "dr-a", MONDAY),
        Resolution::Working(vec![
            WorkingInterval::new(480, 720, 15),
            WorkingInterval::new(840, 1080, 30),
        ])
    );
}

#[test]
fn inactive_schedule_is_ignored() {
    let mut s = schedule("s1", "dr-a", 0, "09:00", "17:00", 15);
    s.is_active = false;
    assert_eq!(
        resolve(&[s], &[], "dr-a", MONDAY),
        Resolution::Unavailable(UnavailableReason::NoSchedule)
    );
}

#[test]
fn valid_until_is_inclusive_and_expired_rows_are_ignored() {
    let mut old = schedule("old", "dr-a", 0, "08:00", "12:00", 15);
    old.valid_until = Some(date("2026-03-16"));
    let mut new = schedule("new", "dr-a", 0, "10:00", "16:00", 15);
    new.valid_from = Some(date("2026-03-17"));
    let schedules = vec![old, new];

    // Last day of the old hours.
    assert_eq!(
        resolve(&schedules, &[], "dr-a", "2026-03-16"),
        Resolution::Working(vec![WorkingInterval::new(480, 720, 15)])
    );
    // The following Monday the superseding row applies.
    assert_eq!(
        resolve(&schedules, &[], "dr-a", "2026-03-23"),
        Resolution::Working(vec![WorkingInterval::new(600, 960, 15)])
    );
}

// ── Exceptions ──────────────────────────────────────────────────────────────

#[test]
fn absence_beats_recurring_schedule() {
    let schedules = vec![schedule("s1", "dr-a", 0, "09:00", "17:00", 15)];
    let exceptions = vec![absence("x1", "dr-a", MONDAY)];
    assert_eq!(
        resolve(&schedules, &exceptions, "dr-a", MONDAY),
        Resolution::Unavailable(UnavailableReason::Absence)
    );
    // Only that date is affected.
    assert!(matches!(
        resolve(&schedules, &exceptions, "dr-a", "2026-03-23"),
        Resolution::Working(_)
    ));
}

#[test]
fn modified_hours_replace_and_inherit_granularity() {
    let schedules = vec![schedule("s1", "dr-a", 0, "09:00", "17:00", 20)];
    let exceptions = vec![modified("x1", "dr-a", MONDAY, "13:00", "15:00")];
    assert_eq!(
        resolve(&schedules, &exceptions, "dr-a", MONDAY),
        Resolution::Working(vec![WorkingInterval::new(780, 900, 20)])
    );
}

#[test]
fn modified_hours_without_base_schedule_use_default_granularity() {
    let exceptions = vec![modified("x1", "dr-a", TUESDAY, "10:00", "12:00")];
    assert_eq!(
        resolve(&[], &exceptions, "dr-a", TUESDAY),
        Resolution::Working(vec![WorkingInterval::new(600, 720, DEFAULT_GRANULARITY)])
    );
}

#[test]
fn duplicate_exceptions_prefer_absence_regardless_of_order() {
    let schedules = vec![schedule("s1", "dr-a", 0, "09:00", "17:00", 15)];
    let forward = vec![modified("a-mod", "dr-a", MONDAY, "10:00", "11:00"), absence("z-abs", "dr-a", MONDAY)];
    let reverse: Vec<ScheduleException> = forward.iter().rev().cloned().collect();

    for exceptions in [forward, reverse] {
        let resolver = ScheduleResolver::new(&schedules, &exceptions, DEFAULT_GRANULARITY);
        assert_eq!(
            resolver.resolve("dr-a", date(MONDAY)),
            Resolution::Unavailable(UnavailableReason::Absence)
        );
        assert_eq!(resolver.warnings().len(), 1);
        assert_eq!(resolver.warnings()[0].record_id, "a-mod");
    }
}

// ── Malformed rows ──────────────────────────────────────────────────────────

#[test]
fn malformed_schedules_are_skipped_with_warnings() {
    let schedules = vec![
        schedule("inverted", "dr-a", 0, "17:00", "09:00", 15),
        schedule("empty", "dr-a", 0, "09:00", "09:00", 15),
        schedule("no-step", "dr-a", 0, "09:00", "12:00", 0),
        schedule("bad-day", "dr-a", 7, "09:00", "12:00", 15),
        schedule("ok", "dr-a", 0, "13:00", "14:00", 15),
    ];
    let resolver = ScheduleResolver::new(&schedules, NO_EXCEPTIONS, DEFAULT_GRANULARITY);

    assert_eq!(
        resolver.resolve("dr-a", date(MONDAY)),
        Resolution::Working(vec![WorkingInterval::new(780, 840, 15)])
    );
    let mut skipped: Vec<&str> = resolver.warnings().iter().map(|w| w.record_id.as_str()).collect();
    skipped.sort();
    assert_eq!(skipped, vec!["bad-day", "empty", "inverted", "no-step"]);
    assert!(resolver.warnings().iter().all(|w| w.kind == RecordKind::Schedule));
}

#[test]
fn malformed_modified_hours_fall_back_to_weekly_schedule() {
    let schedules = vec![schedule("s1", "dr-a", 0, "09:00", "17:00", 15)];
    let mut broken = modified("x1", "dr-a", MONDAY, "15:00", "13:00");
    let resolver_inputs = vec![broken.clone()];
    let resolver = ScheduleResolver::new(&schedules, &resolver_inputs, DEFAULT_GRANULARITY);
    assert_eq!(
        resolver.resolve("dr-a", date(MONDAY)),
        Resolution::Working(vec![WorkingInterval::new(540, 1020, 15)])
    );
    assert_eq!(resolver.warnings()[0].kind, RecordKind::Exception);

    broken.end_time = None;
    let missing = vec![broken];
    let resolver = ScheduleResolver::new(&schedules, &missing, DEFAULT_GRANULARITY);
    assert!(resolver.warnings()[0].issue.contains("missing"));
}

// ── Write-time overlap check ────────────────────────────────────────────────

#[test]
fn overlapping_same_day_schedules_are_reported() {
    let schedules = vec![
        schedule("b", "dr-a", 0, "11:00", "15:00", 15),
        schedule("a", "dr-a", 0, "09:00", "12:00", 15),
    ];
    let overlaps = find_overlapping_schedules(&schedules);
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].first_id, "a");
    assert_eq!(overlaps[0].second_id, "b");
    assert_eq!(overlaps[0].day_of_week, 0);
}

#[test]
fn touching_or_unrelated_schedules_are_not_overlaps() {
    let mut superseded = schedule("old", "dr-a", 1, "09:00", "17:00", 15);
    superseded.valid_until = Some(date("2026-03-01"));
    let mut replacement = schedule("new", "dr-a", 1, "10:00", "18:00", 15);
    replacement.valid_from = Some(date("2026-03-02"));

    let schedules = vec![
        schedule("morning", "dr-a", 0, "08:00", "12:00", 15),
        schedule("afternoon", "dr-a", 0, "12:00", "16:00", 15),
        schedule("other-day", "dr-a", 2, "08:00", "12:00", 15),
        schedule("other-provider", "dr-b", 0, "08:00", "12:00", 15),
        superseded,
        replacement,
    ];
    assert!(find_overlapping_schedules(&schedules).is_empty());
}
