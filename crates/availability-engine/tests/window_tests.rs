//! Tests for booking window validation, range clamping, and the notice cutoff.

use availability_engine::window::{validate, BookingWindow, WindowRejection};
use availability_engine::{AvailabilityError, BookingWindowPolicy};
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Today 2026-03-15 with the default policy: bookable 03-16 ..= 06-13.
fn window() -> BookingWindow {
    BookingWindow::new(&BookingWindowPolicy::new(1, 90).unwrap(), date("2026-03-15"))
}

// ── Single dates ────────────────────────────────────────────────────────────

#[test]
fn bounds_are_inclusive() {
    let w = window();
    assert_eq!(w.min_date, date("2026-03-16"));
    assert_eq!(w.max_date, date("2026-06-13"));
    assert_eq!(w.check(date("2026-03-16")), Ok(()));
    assert_eq!(w.check(date("2026-06-13")), Ok(()));
}

#[test]
fn today_is_too_soon_with_one_day_notice() {
    assert_eq!(window().check(date("2026-03-15")), Err(WindowRejection::TooSoon));
}

#[test]
fn day_after_max_is_too_far_out() {
    assert_eq!(window().check(date("2026-06-14")), Err(WindowRejection::TooFarOut));
}

#[test]
fn rejection_carries_the_bounds() {
    let policy = BookingWindowPolicy::default();
    let err = validate(date("2026-07-01"), &policy, date("2026-03-15")).unwrap_err();
    assert_eq!(
        err,
        AvailabilityError::OutsideBookingWindow {
            date: date("2026-07-01"),
            reason: WindowRejection::TooFarOut,
            min_date: date("2026-03-16"),
            max_date: date("2026-06-13"),
        }
    );
    assert!(err.to_string().contains("too far out"));
}

#[test]
fn zero_notice_allows_today() {
    let policy = BookingWindowPolicy::new(0, 0).unwrap();
    assert!(validate(date("2026-03-15"), &policy, date("2026-03-15")).is_ok());
    assert!(validate(date("2026-03-16"), &policy, date("2026-03-15")).is_err());
}

#[test]
fn max_below_min_is_a_config_error() {
    assert!(matches!(
        BookingWindowPolicy::new(5, 3),
        Err(AvailabilityError::InvalidConfig(_))
    ));
}

// ── Range clamping ──────────────────────────────────────────────────────────

#[test]
fn range_inside_window_is_untouched() {
    let r = window().clamp(date("2026-04-01"), date("2026-04-07"));
    assert!(!r.was_clamped());
    assert!(!r.is_empty());
    assert_eq!(r.dates().count(), 7);
}

#[test]
fn range_straddling_both_edges_is_trimmed() {
    let r = window().clamp(date("2026-03-10"), date("2026-07-01"));
    assert!(r.was_clamped());
    assert_eq!(r.start, date("2026-03-16"));
    assert_eq!(r.end, date("2026-06-13"));
    assert_eq!(r.requested_start, date("2026-03-10"));
}

#[test]
fn range_entirely_outside_is_empty() {
    let w = window();
    assert!(w.clamp(date("2026-03-01"), date("2026-03-15")).is_empty());
    assert!(w.clamp(date("2026-06-14"), date("2026-06-30")).is_empty());
    assert_eq!(w.clamp(date("2026-06-14"), date("2026-06-30")).dates().count(), 0);
}

// ── Notice cutoff ───────────────────────────────────────────────────────────

#[test]
fn cutoff_is_start_of_first_bookable_day() {
    // Sunday noon; the first bookable day is Monday, so Monday 09:00 is fine.
    let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
    assert_eq!(
        window().notice_cutoff(now, Tz::UTC),
        Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap()
    );
}

#[test]
fn cutoff_is_now_for_same_day_booking() {
    let policy = BookingWindowPolicy::new(0, 30).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 15, 15, 40, 0).unwrap();
    let w = BookingWindow::new(&policy, date("2026-03-15"));
    assert_eq!(w.notice_cutoff(now, Tz::UTC), now);
}

#[test]
fn cutoff_follows_practice_timezone() {
    let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
    assert_eq!(
        window().notice_cutoff(now, New_York),
        // Midnight EDT on the 16th.
        Utc.with_ymd_and_hms(2026, 3, 16, 4, 0, 0).unwrap()
    );
}
