//! Calendar session: the state a booking screen keeps between renders.
//!
//! Holds the current schedule snapshot, its load state, the selected date and
//! the displayed month, and produces [`DayCell`]s for the display layer.

use std::sync::Arc;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::grid::{month_grid, MonthCursor};
use crate::horizon::{compute_horizon_with, Horizon, DEFAULT_ROLLING_YEARS};
use crate::resolver::Resolver;
use crate::schedule::ScheduleModel;
use crate::selection::SelectionState;

/// An immutable schedule together with the horizon computed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub model: ScheduleModel,
    pub horizon: Horizon,
    /// Monotonic counter assigned by the publisher; 1 for the first snapshot.
    pub generation: u64,
}

impl ScheduleSnapshot {
    pub fn new(model: ScheduleModel, today: NaiveDate, generation: u64) -> Self {
        Self::with_rolling_years(model, today, DEFAULT_ROLLING_YEARS, generation)
    }

    pub fn with_rolling_years(
        model: ScheduleModel,
        today: NaiveDate,
        rolling_years: u32,
        generation: u64,
    ) -> Self {
        let horizon = compute_horizon_with(&model, today, rolling_years);
        Self {
            model,
            horizon,
            generation,
        }
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.model, &self.horizon)
    }
}

/// Loading lifecycle of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing requested yet.
    Idle,
    /// Waiting for the first snapshot.
    Loading,
    Loaded,
    /// The first fetch failed and nothing has ever been loaded.
    Failed(String),
}

/// One cell of the month grid, as handed to the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCell {
    pub date: NaiveDate,
    /// False for the leading/trailing days of adjacent months.
    pub in_current_month: bool,
    pub selectable: bool,
    pub remaining_slots: usize,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct CalendarSession {
    state: LoadState,
    snapshot: Option<Arc<ScheduleSnapshot>>,
    selection: SelectionState,
    cursor: Option<MonthCursor>,
    first_weekday: Weekday,
    last_error: Option<String>,
}

impl Default for CalendarSession {
    fn default() -> Self {
        Self::new(Weekday::Mon)
    }
}

impl CalendarSession {
    pub fn new(first_weekday: Weekday) -> Self {
        Self {
            state: LoadState::Idle,
            snapshot: None,
            selection: SelectionState::new(),
            cursor: None,
            first_weekday,
            last_error: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&Arc<ScheduleSnapshot>> {
        self.snapshot.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Mark a fetch as in flight. Keeps `Loaded` once data exists.
    pub fn begin_loading(&mut self) {
        if self.snapshot.is_none() {
            self.state = LoadState::Loading;
        }
    }

    /// Swap in a new snapshot. Clears the selection and moves the displayed
    /// month back to the start of the new horizon.
    pub fn apply_snapshot(&mut self, snapshot: Arc<ScheduleSnapshot>) {
        if let Some(current) = &self.snapshot {
            if Arc::ptr_eq(current, &snapshot) {
                return;
            }
        }
        info!(
            generation = snapshot.generation,
            start = %snapshot.horizon.start,
            end = %snapshot.horizon.end,
            "applying schedule snapshot"
        );
        if self.selection.selected().is_some() {
            debug!("schedule replaced; clearing selection");
        }
        self.selection.clear();
        self.cursor = Some(MonthCursor::new(&snapshot.horizon));
        self.snapshot = Some(snapshot);
        self.state = LoadState::Loaded;
        self.last_error = None;
    }

    /// Wait for the next snapshot on a publisher's channel and apply it.
    ///
    /// A value already waiting on the channel is applied without blocking.
    /// Returns the applied generation, or `None` once the publisher has
    /// stopped.
    pub async fn follow(
        &mut self,
        snapshots: &mut watch::Receiver<Option<Arc<ScheduleSnapshot>>>,
    ) -> Option<u64> {
        loop {
            let latest = snapshots.borrow_and_update().clone();
            if let Some(snapshot) = latest {
                let held = self
                    .snapshot
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &snapshot));
                if !held {
                    let generation = snapshot.generation;
                    self.apply_snapshot(snapshot);
                    return Some(generation);
                }
            }
            if snapshots.changed().await.is_err() {
                debug!("snapshot publisher stopped");
                return None;
            }
        }
    }

    /// Record a failed fetch. Previously loaded data stays in place.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        let error = error.into();
        warn!(error = %error, "schedule fetch failed");
        if self.snapshot.is_none() {
            self.state = LoadState::Failed(error.clone());
        }
        self.last_error = Some(error);
    }

    /// Whether the session has a usable schedule.
    pub fn is_ready(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.horizon.is_loadable())
    }

    pub fn is_selectable(&self, date: NaiveDate) -> bool {
        self.remaining_slots(date) > 0
    }

    pub fn remaining_slots(&self, date: NaiveDate) -> usize {
        match &self.snapshot {
            Some(snapshot) if snapshot.horizon.is_loadable() => {
                snapshot.resolver().remaining_slots(date)
            }
            _ => 0,
        }
    }

    pub fn toggle(&mut self, date: NaiveDate) -> Option<NaiveDate> {
        self.selection.toggle(date)
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selection.selected()
    }

    pub fn displayed_month(&self) -> Option<NaiveDate> {
        self.cursor.map(|cursor| cursor.current())
    }

    pub fn cursor(&self) -> Option<&MonthCursor> {
        self.cursor.as_ref()
    }

    pub fn cursor_mut(&mut self) -> Option<&mut MonthCursor> {
        self.cursor.as_mut()
    }

    /// Cells for the displayed month. Empty until a snapshot is loaded.
    pub fn month_cells(&self) -> Vec<DayCell> {
        let Some(cursor) = self.cursor else {
            return Vec::new();
        };
        month_grid(cursor.current(), self.first_weekday)
            .into_iter()
            .flat_map(|week| week.days)
            .map(|date| {
                let remaining = self.remaining_slots(date);
                DayCell {
                    date,
                    in_current_month: cursor.is_current_month(date),
                    selectable: remaining > 0,
                    remaining_slots: remaining,
                    selected: self.selection.is_selected(date),
                }
            })
            .collect()
    }
}
