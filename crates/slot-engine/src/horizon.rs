//! Booking horizon: the inclusive date range outside which nothing is
//! selectable.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::schedule::{PlanningMode, ScheduleModel};

/// Default length of the rolling horizon for weekly schedules.
pub const DEFAULT_ROLLING_YEARS: u32 = 2;

/// Where the horizon bounds came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonSource {
    /// Both bounds were given explicitly by the schedule.
    Explicit,
    /// Derived from the earliest/latest keyed date of an explicit date list.
    DateKeys,
    /// Weekly schedule: today (or explicit start) plus the rolling window.
    Rolling,
    /// Explicit date list with no dates at all. Not loadable.
    EmptyFallback,
    /// The bounds came out inverted (an end date already in the past, or a
    /// start date beyond the rolling end). Contains no date.
    Expired,
}

/// Inclusive `[start, end]` range. `start <= end` always holds; an
/// [`HorizonSource::Expired`] horizon contains no date at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: HorizonSource,
}

impl Horizon {
    /// Build a horizon. Inverted bounds give an empty [`HorizonSource::Expired`]
    /// horizon anchored on the earlier date; no bound is ever widened.
    pub fn new(start: NaiveDate, end: NaiveDate, source: HorizonSource) -> Self {
        if end < start {
            warn!(%start, %end, "horizon end precedes start; nothing is bookable");
            return Self {
                start: end,
                end,
                source: HorizonSource::Expired,
            };
        }
        Self { start, end, source }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.source != HorizonSource::Expired && self.start <= date && date <= self.end
    }

    /// False when the horizon is a placeholder for a schedule with no
    /// bookable range.
    pub fn is_loadable(&self) -> bool {
        !matches!(
            self.source,
            HorizonSource::EmptyFallback | HorizonSource::Expired
        )
    }

    /// Number of days inside the horizon. Zero when expired.
    pub fn days(&self) -> i64 {
        if self.source == HorizonSource::Expired {
            return 0;
        }
        (self.end - self.start).num_days() + 1
    }

    /// First day of every month the range touches, in order.
    pub fn months(&self) -> impl Iterator<Item = NaiveDate> {
        let last = first_of_month(self.end);
        std::iter::successors(Some(first_of_month(self.start)), move |month| {
            month
                .checked_add_months(Months::new(1))
                .filter(|next| *next <= last)
        })
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Compute the horizon with the default rolling window.
pub fn compute_horizon(model: &ScheduleModel, today: NaiveDate) -> Horizon {
    compute_horizon_with(model, today, DEFAULT_ROLLING_YEARS)
}

/// Compute the horizon for `model`, treating `today` as the current day.
///
/// Explicit bounds win per side. Otherwise an explicit date list spans its
/// keys and a weekly schedule runs from today for `rolling_years`.
pub fn compute_horizon_with(
    model: &ScheduleModel,
    today: NaiveDate,
    rolling_years: u32,
) -> Horizon {
    let explicit = (model.explicit_start(), model.explicit_end());
    if let (Some(start), Some(end)) = explicit {
        return Horizon::new(start, end, HorizonSource::Explicit);
    }

    match model.mode() {
        PlanningMode::ExplicitDateList { dates } => match dates.bounds() {
            Some((first, last)) => Horizon::new(
                explicit.0.unwrap_or(first),
                explicit.1.unwrap_or(last),
                HorizonSource::DateKeys,
            ),
            None => Horizon::new(
                explicit.0.unwrap_or(today),
                explicit.1.unwrap_or(today),
                HorizonSource::EmptyFallback,
            ),
        },
        PlanningMode::WeeklyRecurring { .. } => {
            let start = explicit.0.unwrap_or(today);
            let end = explicit.1.unwrap_or_else(|| rolling_end(today, rolling_years));
            Horizon::new(start, end, HorizonSource::Rolling)
        }
    }
}

fn rolling_end(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_add_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MAX)
}
