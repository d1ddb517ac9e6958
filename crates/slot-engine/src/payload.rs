//! Raw schedule payload as decoded from the wire, and its validation into a
//! [`ScheduleModel`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::date::parse_wire_date;
use crate::error::{Result, ScheduleError};
use crate::schedule::{BookedSessions, DateSlots, ScheduleModel, WeeklyTemplate};

/// `planningOption` value selecting the weekly template mode.
pub const PLANNING_OPTION_WEEKLY: u8 = 1;
/// `planningOption` value selecting the explicit date-list mode.
pub const PLANNING_OPTION_DAILY: u8 = 2;

/// One booked session in list form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedSessionRecord {
    /// `DD/MM/YYYY`.
    pub date: String,
    /// Slot label, compared verbatim against planning labels.
    pub hour: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub pricing: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_note: Option<String>,
}

impl BookedSessions {
    /// Fold booking records into per-date booked slots.
    pub fn from_records(records: &[BookedSessionRecord]) -> Result<Self> {
        let mut booked = BookedSessions::default();
        for record in records {
            let date = parse_wire_date(&record.date)
                .ok_or_else(|| ScheduleError::malformed_date("bookedSessions", &record.date))?;
            booked.insert(date, record.hour.clone());
        }
        Ok(booked)
    }
}

/// Raw schedule payload.
///
/// ```json
/// {
///   "planningOption": 1,
///   "weeklyPlanning": { "1": ["10:00"], "2": [] },
///   "weeklyModifiedDates": { "02/10/2023": [] },
///   "bookedDates": { "09/10/2023": ["10:00"] },
///   "durationSession": 120
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchedulePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning_option: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_planning: Option<BTreeMap<u32, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_modified_dates: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_planning: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_dates: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_sessions: Option<Vec<BookedSessionRecord>>,
    pub duration_session: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeTag {
    Weekly,
    Daily,
}

impl RawSchedulePayload {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn mode_tag(&self) -> Result<ModeTag> {
        match self.planning_option {
            Some(PLANNING_OPTION_WEEKLY) => Ok(ModeTag::Weekly),
            Some(PLANNING_OPTION_DAILY) => Ok(ModeTag::Daily),
            Some(other) => Err(ScheduleError::UnknownPlanningOption(other)),
            None => match (self.has_weekly_fields(), self.daily_planning.is_some()) {
                (true, true) => Err(ScheduleError::AmbiguousPlanningMode),
                (true, false) => Ok(ModeTag::Weekly),
                (false, _) => Ok(ModeTag::Daily),
            },
        }
    }

    /// Any field that only means something for a weekly schedule. A weekly
    /// payload may omit the template and carry overrides alone.
    fn has_weekly_fields(&self) -> bool {
        self.weekly_planning.is_some()
            || self.weekly_modified_dates.is_some()
            || self.weekly_start_date.is_some()
            || self.weekly_end_date.is_some()
    }

    fn session_minutes(&self) -> Result<u32> {
        let minutes = self.duration_session;
        if !minutes.is_finite() || minutes < 1.0 || minutes > f64::from(u32::MAX) {
            return Err(ScheduleError::InvalidDuration(minutes));
        }
        Ok(minutes.round() as u32)
    }

    fn bound(field: &'static str, value: Option<&String>) -> Result<Option<chrono::NaiveDate>> {
        value
            .map(|raw| {
                parse_wire_date(raw).ok_or_else(|| ScheduleError::malformed_date(field, raw))
            })
            .transpose()
    }

    fn bookings(&self) -> Result<BookedSessions> {
        let mut booked = match &self.booked_dates {
            Some(raw) => BookedSessions::from_wire(raw)?,
            None => BookedSessions::default(),
        };
        if let Some(records) = &self.booked_sessions {
            booked.merge(BookedSessions::from_records(records)?);
        }
        Ok(booked)
    }
}

impl TryFrom<RawSchedulePayload> for ScheduleModel {
    type Error = ScheduleError;

    fn try_from(raw: RawSchedulePayload) -> Result<Self> {
        let duration = raw.session_minutes()?;
        let booked = raw.bookings()?;

        let model = match raw.mode_tag()? {
            ModeTag::Weekly => {
                let template =
                    WeeklyTemplate::new(raw.weekly_planning.clone().unwrap_or_default())?;
                let overrides = match &raw.weekly_modified_dates {
                    Some(map) => DateSlots::from_wire("weeklyModifiedDates", map)?,
                    None => DateSlots::default(),
                };
                let start =
                    RawSchedulePayload::bound("weeklyStartDate", raw.weekly_start_date.as_ref())?;
                let end = RawSchedulePayload::bound("weeklyEndDate", raw.weekly_end_date.as_ref())?;
                if raw.daily_planning.is_some() {
                    debug!("ignoring dailyPlanning on a weekly schedule");
                }
                ScheduleModel::weekly(template, overrides).with_bounds(start, end)
            }
            ModeTag::Daily => {
                let dates = match &raw.daily_planning {
                    Some(map) => DateSlots::from_wire("dailyPlanning", map)?,
                    None => DateSlots::default(),
                };
                if raw.weekly_planning.is_some() || raw.weekly_modified_dates.is_some() {
                    debug!("ignoring weekly planning fields on a daily schedule");
                }
                if dates.is_empty() {
                    warn!("daily schedule has no dates");
                }
                ScheduleModel::explicit(dates)
            }
        };

        let model = model
            .with_bookings(booked)
            .with_session_duration(duration);
        debug!(
            weekly = model.is_weekly(),
            date_entries = model.date_entries().len(),
            booked = model.booked().len(),
            "schedule model built"
        );
        Ok(model)
    }
}

impl ScheduleModel {
    /// Decode and validate a JSON payload in one step.
    pub fn from_json(json: &str) -> Result<Self> {
        RawSchedulePayload::from_json(json)?.try_into()
    }
}
