//! Tests for month grid layout and horizon-bounded navigation.

use chrono::{Datelike, NaiveDate, Weekday};
use slot_engine::grid::{add_months, month_grid, start_of_month, MonthCursor};
use slot_engine::horizon::{Horizon, HorizonSource};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ── month_grid ──────────────────────────────────────────────────────────────

#[test]
fn monday_first_grid_pads_with_adjacent_months() {
    // October 2023 starts on a Sunday and ends on a Tuesday.
    let weeks = month_grid(ymd(2023, 10, 17), Weekday::Mon);

    assert_eq!(weeks.len(), 6);
    assert_eq!(weeks[0].days[0], ymd(2023, 9, 25));
    assert_eq!(weeks[0].days[6], ymd(2023, 10, 1));
    assert_eq!(weeks[5].days[0], ymd(2023, 10, 30));
    assert_eq!(weeks[5].days[6], ymd(2023, 11, 5));
    assert_eq!(weeks[0].number, 39);
}

#[test]
fn sunday_first_grid_of_same_month() {
    let weeks = month_grid(ymd(2023, 10, 1), Weekday::Sun);

    assert_eq!(weeks.len(), 5);
    assert_eq!(weeks[0].days[0], ymd(2023, 10, 1));
    assert_eq!(weeks[4].days[6], ymd(2023, 11, 4));
}

#[test]
fn exact_four_week_month() {
    // February 2021: starts Monday, 28 days.
    let weeks = month_grid(ymd(2021, 2, 1), Weekday::Mon);
    assert_eq!(weeks.len(), 4);
    assert_eq!(weeks[3].days[6], ymd(2021, 2, 28));
}

#[test]
fn every_row_starts_on_first_weekday_and_covers_month() {
    for first_weekday in [Weekday::Mon, Weekday::Sun, Weekday::Sat] {
        for month in 1..=12 {
            let weeks = month_grid(ymd(2024, month, 1), first_weekday);
            for week in &weeks {
                assert_eq!(week.days[0].weekday(), first_weekday);
            }
            let all: Vec<_> = weeks.iter().flat_map(|w| w.days).collect();
            let in_month = all.iter().filter(|d| d.month() == month).count();
            let expected = add_months(ymd(2024, month, 1), 1)
                .map(|next| (next - ymd(2024, month, 1)).num_days() as usize)
                .unwrap();
            assert_eq!(in_month, expected, "month {month} with {first_weekday:?}");
        }
    }
}

// ── helpers ─────────────────────────────────────────────────────────────────

#[test]
fn month_arithmetic() {
    assert_eq!(start_of_month(ymd(2023, 10, 17)), ymd(2023, 10, 1));
    assert_eq!(add_months(ymd(2023, 12, 15), 1), Some(ymd(2024, 1, 1)));
    assert_eq!(add_months(ymd(2024, 1, 31), -2), Some(ymd(2023, 11, 1)));
    assert_eq!(add_months(ymd(2024, 1, 31), 0), Some(ymd(2024, 1, 1)));
}

// ── MonthCursor ─────────────────────────────────────────────────────────────

#[test]
fn cursor_stays_within_horizon_months() {
    let horizon = Horizon::new(ymd(2023, 9, 26), ymd(2023, 12, 30), HorizonSource::DateKeys);
    let mut cursor = MonthCursor::new(&horizon);

    assert_eq!(cursor.current(), ymd(2023, 9, 1));
    assert!(!cursor.can_go_previous());
    assert!(!cursor.previous());

    assert!(cursor.next());
    assert!(cursor.next());
    assert!(cursor.next());
    assert_eq!(cursor.current(), ymd(2023, 12, 1));
    assert!(!cursor.can_go_next());
    assert!(!cursor.next());
    assert_eq!(cursor.current(), ymd(2023, 12, 1));

    assert!(cursor.previous());
    assert_eq!(cursor.current(), ymd(2023, 11, 1));
    assert!(cursor.is_current_month(ymd(2023, 11, 30)));
    assert!(!cursor.is_current_month(ymd(2023, 12, 1)));
}

#[test]
fn cursor_jump_is_clamped() {
    let horizon = Horizon::new(ymd(2023, 9, 26), ymd(2023, 12, 30), HorizonSource::DateKeys);
    let mut cursor = MonthCursor::new(&horizon);

    cursor.jump_to(ymd(2024, 6, 1));
    assert_eq!(cursor.current(), ymd(2023, 12, 1));
    cursor.jump_to(ymd(2020, 1, 1));
    assert_eq!(cursor.current(), ymd(2023, 9, 1));
    cursor.jump_to(ymd(2023, 10, 20));
    assert_eq!(cursor.current(), ymd(2023, 10, 1));
}

#[test]
fn single_day_horizon_has_one_month() {
    let day = ymd(2023, 10, 18);
    let cursor = MonthCursor::new(&Horizon::new(day, day, HorizonSource::EmptyFallback));
    assert!(!cursor.can_go_next());
    assert!(!cursor.can_go_previous());
}
