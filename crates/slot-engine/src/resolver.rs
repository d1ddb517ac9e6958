//! Availability resolution: is a date selectable, and how many slots remain?
//!
//! Precedence for a single date, highest first:
//!
//! 1. Outside the horizon: never selectable.
//! 2. Per-date entry with no slots (tombstone): closed.
//! 3. Per-date entry with slots: replaces the weekday template for that date.
//! 4. Weekday template slots (none in explicit-date mode).
//!
//! Booked sessions are then subtracted by label. A date with nothing left
//! after subtraction is not selectable.
//!
//! Every function here is pure: no I/O, no failure, no mutation of the model.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::horizon::Horizon;
use crate::schedule::ScheduleModel;

/// Why a date resolved the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// At least one slot is still open.
    Open,
    OutsideHorizon,
    /// A per-date entry with an empty slot list closes the date.
    Tombstoned,
    /// No template or per-date slots for this date.
    NoSlots,
    /// Every effective slot is already booked.
    FullyBooked,
}

/// Resolved availability for a single calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub verdict: Verdict,
    /// Slots after override-over-template precedence, before bookings.
    pub effective_slots: Vec<String>,
    /// Effective slots that are not booked, in schedule order.
    pub open_slots: Vec<String>,
}

impl DayAvailability {
    pub fn is_selectable(&self) -> bool {
        self.verdict == Verdict::Open
    }

    pub fn remaining_slots(&self) -> usize {
        self.open_slots.len()
    }
}

/// Read-only view over one schedule snapshot and its horizon.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    model: &'a ScheduleModel,
    horizon: &'a Horizon,
}

impl<'a> Resolver<'a> {
    pub fn new(model: &'a ScheduleModel, horizon: &'a Horizon) -> Self {
        Self { model, horizon }
    }

    pub fn horizon(&self) -> &'a Horizon {
        self.horizon
    }

    /// Effective slots for `date`, ignoring the horizon and bookings.
    ///
    /// `None` means the date is tombstoned. An empty slice means it simply
    /// has no slots.
    pub fn effective_slots(&self, date: NaiveDate) -> Option<&'a [String]> {
        match self.model.override_for_date(date) {
            Some([]) => None,
            Some(slots) => Some(slots),
            None => Some(self.model.base_slots(date)),
        }
    }

    /// Open slot labels for `date`, in schedule order. Empty when the date is
    /// not selectable.
    pub fn open_slots(&self, date: NaiveDate) -> Vec<&'a str> {
        if !self.horizon.contains(date) {
            return Vec::new();
        }
        let Some(effective) = self.effective_slots(date) else {
            return Vec::new();
        };
        let booked = self.model.booked_slots_for_date(date);
        effective
            .iter()
            .filter(|label| !booked.contains(label.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn is_selectable(&self, date: NaiveDate) -> bool {
        self.remaining_slots(date) > 0
    }

    pub fn remaining_slots(&self, date: NaiveDate) -> usize {
        if !self.horizon.contains(date) {
            return 0;
        }
        let Some(effective) = self.effective_slots(date) else {
            return 0;
        };
        let booked = self.model.booked_slots_for_date(date);
        if booked.is_empty() {
            return effective.len();
        }
        effective
            .iter()
            .filter(|label| !booked.contains(label.as_str()))
            .count()
    }

    /// Full resolution for `date`, including the reason for the verdict.
    pub fn resolve(&self, date: NaiveDate) -> DayAvailability {
        let (verdict, effective) = if !self.horizon.contains(date) {
            (Verdict::OutsideHorizon, Vec::new())
        } else {
            match self.effective_slots(date) {
                None => (Verdict::Tombstoned, Vec::new()),
                Some([]) => (Verdict::NoSlots, Vec::new()),
                Some(slots) => (Verdict::Open, slots.to_vec()),
            }
        };

        let open: Vec<String> = if verdict == Verdict::Open {
            self.open_slots(date).into_iter().map(str::to_string).collect()
        } else {
            Vec::new()
        };

        let verdict = if verdict == Verdict::Open && open.is_empty() {
            Verdict::FullyBooked
        } else {
            verdict
        };

        DayAvailability {
            date,
            verdict,
            effective_slots: effective,
            open_slots: open,
        }
    }

    /// Resolve every date in `[from, to]` inclusive. Empty if `from > to`.
    pub fn resolve_range(&self, from: NaiveDate, to: NaiveDate) -> Vec<DayAvailability> {
        std::iter::successors(Some(from), |day| day.checked_add_days(Days::new(1)))
            .take_while(|day| *day <= to)
            .map(|day| self.resolve(day))
            .collect()
    }

    /// First selectable date on or after `from`, within the horizon.
    pub fn next_selectable(&self, from: NaiveDate) -> Option<NaiveDate> {
        let start = from.max(self.horizon.start);
        std::iter::successors(Some(start), |day| day.checked_add_days(Days::new(1)))
            .take_while(|day| *day <= self.horizon.end)
            .find(|day| self.is_selectable(*day))
    }
}
