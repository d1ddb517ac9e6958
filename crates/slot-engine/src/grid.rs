//! Month grid layout and month-by-month navigation.
//!
//! The first day of the week only affects layout here; availability always
//! uses ISO weekday numbers.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::horizon::Horizon;

pub const DAYS_IN_WEEK: usize = 7;

/// One row of the month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Week {
    /// ISO week number of the row's first day.
    pub number: u32,
    pub days: [NaiveDate; DAYS_IN_WEEK],
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Shift a month start by `delta` months. `None` outside chrono's range.
pub fn add_months(month: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let month = start_of_month(month);
    let step = Months::new(delta.unsigned_abs());
    if delta >= 0 {
        month.checked_add_months(step)
    } else {
        month.checked_sub_months(step)
    }
}

/// Whole weeks covering the month containing `month`, rows starting on
/// `first_weekday`. Leading and trailing days belong to adjacent months.
pub fn month_grid(month: NaiveDate, first_weekday: Weekday) -> Vec<Week> {
    let first = start_of_month(month);
    let Some(next_month) = first.checked_add_months(Months::new(1)) else {
        return Vec::new();
    };
    let lead = u64::from(
        (first.weekday().num_days_from_monday() + 7 - first_weekday.num_days_from_monday()) % 7,
    );
    let Some(mut cursor) = first.checked_sub_days(Days::new(lead)) else {
        return Vec::new();
    };

    let mut weeks = Vec::with_capacity(6);
    while cursor < next_month {
        let mut days = [cursor; DAYS_IN_WEEK];
        for (offset, slot) in days.iter_mut().enumerate() {
            match cursor.checked_add_days(Days::new(offset as u64)) {
                Some(day) => *slot = day,
                None => return weeks,
            }
        }
        weeks.push(Week {
            number: days[0].iso_week().week(),
            days,
        });
        match cursor.checked_add_days(Days::new(DAYS_IN_WEEK as u64)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    weeks
}

/// The month currently shown, bounded by a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    current: NaiveDate,
    first: NaiveDate,
    last: NaiveDate,
}

impl MonthCursor {
    /// Start at the horizon's first month.
    pub fn new(horizon: &Horizon) -> Self {
        let first = start_of_month(horizon.start);
        Self {
            current: first,
            first,
            last: start_of_month(horizon.end),
        }
    }

    /// Jump to the month containing `date`, clamped to the horizon.
    pub fn jump_to(&mut self, date: NaiveDate) {
        self.current = start_of_month(date).clamp(self.first, self.last);
    }

    /// First day of the displayed month.
    pub fn current(&self) -> NaiveDate {
        self.current
    }

    pub fn can_go_next(&self) -> bool {
        self.current < self.last
    }

    pub fn can_go_previous(&self) -> bool {
        self.current > self.first
    }

    /// Advance one month unless already on the horizon's last month.
    pub fn next(&mut self) -> bool {
        self.step(1)
    }

    pub fn previous(&mut self) -> bool {
        self.step(-1)
    }

    fn step(&mut self, delta: i32) -> bool {
        match add_months(self.current, delta) {
            Some(month) if month >= self.first && month <= self.last => {
                self.current = month;
                true
            }
            _ => false,
        }
    }

    /// Whether `date` falls in the displayed month.
    pub fn is_current_month(&self, date: NaiveDate) -> bool {
        start_of_month(date) == self.current
    }
}
