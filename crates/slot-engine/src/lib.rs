//! # slot-engine
//!
//! Availability resolution for booking calendars built on a weekly template
//! with per-date exceptions.
//!
//! A provider publishes a schedule: slots per weekday, per-date overrides
//! (including "closed" tombstones) or an explicit list of dated slots, plus the
//! sessions already booked. This crate validates that schedule into an
//! immutable [`ScheduleModel`], derives the bookable [`Horizon`], and answers,
//! for every calendar cell, whether the date can be picked and how many slots
//! are still open.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use slot_engine::{compute_horizon, Resolver, ScheduleModel};
//!
//! let model = ScheduleModel::from_json(r#"{
//!     "dailyPlanning": { "27/09/2023": ["12:00", "19:00"] },
//!     "bookedDates": { "27/09/2023": ["12:00"] },
//!     "durationSession": 60
//! }"#).unwrap();
//!
//! let today = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
//! let horizon = compute_horizon(&model, today);
//! let resolver = Resolver::new(&model, &horizon);
//!
//! let day = NaiveDate::from_ymd_opt(2023, 9, 27).unwrap();
//! assert!(resolver.is_selectable(day));
//! assert_eq!(resolver.remaining_slots(day), 1);
//! ```
//!
//! ## Modules
//!
//! - [`date`]: `DD/MM/YYYY` wire dates and ISO weekday numbers
//! - [`schedule`]: weekly template, per-date slots, bookings, `ScheduleModel`
//! - [`payload`]: raw JSON payload and its validation into a model
//! - [`horizon`]: inclusive bookable date range
//! - [`resolver`]: per-date selectability and remaining slot counts
//! - [`selection`]: toggle-style date selection
//! - [`grid`]: month grid rows and horizon-bounded month navigation
//! - [`session`]: load state, snapshots and display cells for a booking screen
//! - [`refresh`]: async polling loop publishing schedule snapshots
//! - [`config`], [`clock`], [`tracing`], [`error`]: configuration, "today", logging, errors

pub mod clock;
pub mod config;
pub mod date;
pub mod error;
pub mod grid;
pub mod horizon;
pub mod payload;
pub mod refresh;
pub mod resolver;
pub mod schedule;
pub mod selection;
pub mod session;
pub mod tracing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CalendarConfig, EngineConfig, RefreshConfig, SnapshotPolicy};
pub use date::{format_wire_date, iso_weekday, parse_wire_date, weekday_from_iso};
pub use error::{ConfigError, RefreshError, ScheduleError, SourceError};
pub use grid::{month_grid, MonthCursor, Week};
pub use horizon::{compute_horizon, compute_horizon_with, Horizon, HorizonSource};
pub use payload::{BookedSessionRecord, RawSchedulePayload};
pub use refresh::{
    JsonFileSource, RefreshCoordinator, RefreshHandle, RefreshStatus, ScheduleSource, StaticSource,
};
pub use resolver::{DayAvailability, Resolver, Verdict};
pub use schedule::{BookedSessions, DateSlots, PlanningMode, ScheduleModel, WeeklyTemplate};
pub use selection::SelectionState;
pub use session::{CalendarSession, DayCell, LoadState, ScheduleSnapshot};
