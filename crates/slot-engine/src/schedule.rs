//! Normalized, immutable schedule model.
//!
//! A [`ScheduleModel`] is built once from a raw payload (see [`crate::payload`])
//! and never mutated afterwards. Replacing the schedule means building a new
//! model. Every date is a [`NaiveDate`]; the wire format only exists at the
//! construction boundary.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::date::{iso_weekday, parse_wire_date};
use crate::error::{Result, ScheduleError};

static NO_BOOKINGS: BTreeSet<String> = BTreeSet::new();

/// Drop repeated labels, keeping the first occurrence and the original order.
fn dedupe(labels: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    labels
        .into_iter()
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// Recurring availability keyed by ISO weekday (1 = Monday .. 7 = Sunday).
///
/// An absent weekday and a weekday mapped to an empty sequence are the same
/// thing: no slots on that day. [`WeeklyTemplate::slots_for_weekday`] returns
/// an empty slice for both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyTemplate {
    slots: BTreeMap<u32, Vec<String>>,
}

impl WeeklyTemplate {
    /// Build a template, rejecting weekday numbers outside 1..=7.
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, Vec<String>)>,
    {
        let mut slots = BTreeMap::new();
        for (weekday, labels) in entries {
            if !(1..=7).contains(&weekday) {
                return Err(ScheduleError::InvalidWeekday(weekday));
            }
            slots.insert(weekday, dedupe(labels));
        }
        Ok(Self { slots })
    }

    pub fn slots_for_weekday(&self, weekday: u32) -> &[String] {
        self.slots.get(&weekday).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Weekdays that carry at least one slot, ascending.
    pub fn open_weekdays(&self) -> Vec<u32> {
        self.slots
            .iter()
            .filter(|(_, labels)| !labels.is_empty())
            .map(|(weekday, _)| *weekday)
            .collect()
    }
}

/// Slot sequences keyed by calendar date.
///
/// Used both for weekly-mode overrides and for the explicit date list. An
/// entry with an empty sequence is a tombstone: the date is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateSlots {
    slots: BTreeMap<NaiveDate, Vec<String>>,
}

impl DateSlots {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Vec<String>)>,
    {
        Self {
            slots: entries
                .into_iter()
                .map(|(date, labels)| (date, dedupe(labels)))
                .collect(),
        }
    }

    /// Parse a wire map (`DD/MM/YYYY` keys). `field` names the payload field
    /// in the error when a key is malformed.
    pub fn from_wire(field: &'static str, raw: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut slots = BTreeMap::new();
        for (key, labels) in raw {
            let date =
                parse_wire_date(key).ok_or_else(|| ScheduleError::malformed_date(field, key))?;
            slots.insert(date, dedupe(labels.clone()));
        }
        Ok(Self { slots })
    }

    pub fn get(&self, date: NaiveDate) -> Option<&[String]> {
        self.slots.get(&date).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Earliest and latest keyed dates, tombstones included.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.slots.keys().next()?;
        let last = self.slots.keys().next_back()?;
        Some((*first, *last))
    }

    /// Dates explicitly closed by an empty entry.
    pub fn tombstones(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.slots
            .iter()
            .filter(|(_, labels)| labels.is_empty())
            .map(|(date, _)| *date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[String])> + '_ {
        self.slots.iter().map(|(date, labels)| (*date, labels.as_slice()))
    }
}

/// Slots already consumed, grouped by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookedSessions {
    by_date: BTreeMap<NaiveDate, BTreeSet<String>>,
}

impl BookedSessions {
    pub fn new<I>(sessions: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, String)>,
    {
        let mut booked = Self::default();
        for (date, label) in sessions {
            booked.insert(date, label);
        }
        booked
    }

    pub fn insert(&mut self, date: NaiveDate, label: impl Into<String>) {
        self.by_date.entry(date).or_default().insert(label.into());
    }

    /// Parse the `bookedDates` wire map (date string to booked labels).
    pub fn from_wire(raw: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut booked = Self::default();
        for (key, labels) in raw {
            let date = parse_wire_date(key)
                .ok_or_else(|| ScheduleError::malformed_date("bookedDates", key))?;
            for label in labels {
                booked.insert(date, label.clone());
            }
        }
        Ok(booked)
    }

    pub fn for_date(&self, date: NaiveDate) -> &BTreeSet<String> {
        self.by_date.get(&date).unwrap_or(&NO_BOOKINGS)
    }

    /// Total number of booked (date, slot) pairs.
    pub fn len(&self) -> usize {
        self.by_date.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.values().all(BTreeSet::is_empty)
    }

    pub fn merge(&mut self, other: BookedSessions) {
        for (date, labels) in other.by_date {
            self.by_date.entry(date).or_default().extend(labels);
        }
    }
}

/// Which resolution mode a schedule uses. Exactly one is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningMode {
    /// Weekday template, with per-date overrides and tombstones.
    WeeklyRecurring {
        template: WeeklyTemplate,
        overrides: DateSlots,
    },
    /// Only the listed dates carry slots; there is no weekday template.
    ExplicitDateList { dates: DateSlots },
}

/// Immutable availability schedule for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleModel {
    mode: PlanningMode,
    booked: BookedSessions,
    session_duration_minutes: u32,
    explicit_start: Option<NaiveDate>,
    explicit_end: Option<NaiveDate>,
}

impl ScheduleModel {
    pub fn weekly(template: WeeklyTemplate, overrides: DateSlots) -> Self {
        Self::from_mode(PlanningMode::WeeklyRecurring {
            template,
            overrides,
        })
    }

    pub fn explicit(dates: DateSlots) -> Self {
        Self::from_mode(PlanningMode::ExplicitDateList { dates })
    }

    fn from_mode(mode: PlanningMode) -> Self {
        Self {
            mode,
            booked: BookedSessions::default(),
            session_duration_minutes: 60,
            explicit_start: None,
            explicit_end: None,
        }
    }

    #[must_use]
    pub fn with_bookings(mut self, booked: BookedSessions) -> Self {
        self.booked = booked;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.explicit_start = start;
        self.explicit_end = end;
        self
    }

    #[must_use]
    pub fn with_session_duration(mut self, minutes: u32) -> Self {
        self.session_duration_minutes = minutes;
        self
    }

    pub fn mode(&self) -> &PlanningMode {
        &self.mode
    }

    pub fn is_weekly(&self) -> bool {
        matches!(self.mode, PlanningMode::WeeklyRecurring { .. })
    }

    pub fn session_duration_minutes(&self) -> u32 {
        self.session_duration_minutes
    }

    pub fn explicit_start(&self) -> Option<NaiveDate> {
        self.explicit_start
    }

    pub fn explicit_end(&self) -> Option<NaiveDate> {
        self.explicit_end
    }

    pub fn booked(&self) -> &BookedSessions {
        &self.booked
    }

    /// Template slots for an ISO weekday. Always empty in explicit-date mode.
    pub fn slots_for_weekday(&self, weekday: u32) -> &[String] {
        match &self.mode {
            PlanningMode::WeeklyRecurring { template, .. } => template.slots_for_weekday(weekday),
            PlanningMode::ExplicitDateList { .. } => &[],
        }
    }

    /// The per-date entry for `date`: an override in weekly mode, the listed
    /// slots in explicit-date mode.
    pub fn override_for_date(&self, date: NaiveDate) -> Option<&[String]> {
        self.date_entries().get(date)
    }

    pub fn booked_slots_for_date(&self, date: NaiveDate) -> &BTreeSet<String> {
        self.booked.for_date(date)
    }

    /// The date-keyed map for the active mode.
    pub fn date_entries(&self) -> &DateSlots {
        match &self.mode {
            PlanningMode::WeeklyRecurring { overrides, .. } => overrides,
            PlanningMode::ExplicitDateList { dates } => dates,
        }
    }

    /// Base slots for `date` before any per-date entry is applied.
    pub fn base_slots(&self, date: NaiveDate) -> &[String] {
        self.slots_for_weekday(iso_weekday(date))
    }
}
