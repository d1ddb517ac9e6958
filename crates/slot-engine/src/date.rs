//! Wire-format dates (`DD/MM/YYYY`) and fixed ISO weekday numbering.

use chrono::{Datelike, NaiveDate, Weekday};

/// Format string for every date key on the wire.
pub const WIRE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Parse a `DD/MM/YYYY` date string.
///
/// Returns `None` for anything that is not a real Gregorian calendar day.
/// Surrounding whitespace is ignored.
pub fn parse_wire_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    // chrono accepts unpadded fields; the wire format is always zero-padded.
    if trimmed.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, WIRE_DATE_FORMAT).ok()
}

/// Format a date as `DD/MM/YYYY`.
pub fn format_wire_date(date: NaiveDate) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

/// ISO weekday number: 1 = Monday .. 7 = Sunday.
pub fn iso_weekday(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// Inverse of [`iso_weekday`]. `None` outside 1..=7.
pub fn weekday_from_iso(number: u32) -> Option<Weekday> {
    match number {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}
