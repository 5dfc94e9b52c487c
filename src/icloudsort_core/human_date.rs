//! Parsing of the catalog's human-readable creation dates, e.g.
//! `Sunday August 13,2023 3:09 PM GMT`.

use crate::icloudsort_core::error::{IcloudsortError, Result};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Layouts tried in order once the weekday and zone have been split off.
const HUMAN_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!(
        "[month repr:long case_sensitive:false] [day padding:none], [year] [hour repr:12 padding:none]:[minute] [period case_sensitive:false]"
    ),
    format_description!(
        "[month repr:long case_sensitive:false] [day padding:none], [year] [hour repr:12 padding:none]:[minute]:[second] [period case_sensitive:false]"
    ),
    format_description!(
        "[month repr:short case_sensitive:false] [day padding:none], [year] [hour repr:12 padding:none]:[minute] [period case_sensitive:false]"
    ),
    format_description!(
        "[month repr:short case_sensitive:false] [day padding:none], [year] [hour repr:12 padding:none]:[minute]:[second] [period case_sensitive:false]"
    ),
    format_description!(
        "[month repr:long case_sensitive:false] [day padding:none], [year] [hour padding:none]:[minute]"
    ),
    format_description!(
        "[month repr:long case_sensitive:false] [day padding:none], [year] [hour padding:none]:[minute]:[second]"
    ),
    format_description!(
        "[month repr:short case_sensitive:false] [day padding:none], [year] [hour padding:none]:[minute]"
    ),
    format_description!(
        "[month repr:short case_sensitive:false] [day padding:none], [year] [hour padding:none]:[minute]:[second]"
    ),
];

const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

/// Fixed offsets for the zone abbreviations the export is known to use, in minutes east of UTC.
const ZONE_ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("UT", 0),
    ("GMT", 0),
    ("Z", 0),
    ("WET", 0),
    ("WEST", 60),
    ("BST", 60),
    ("CET", 60),
    ("CEST", 120),
    ("EET", 120),
    ("EEST", 180),
    ("MSK", 180),
    ("IST", 330),
    ("ICT", 420),
    ("HKT", 480),
    ("SGT", 480),
    ("AWST", 480),
    ("JST", 540),
    ("KST", 540),
    ("ACST", 570),
    ("AEST", 600),
    ("AEDT", 660),
    ("NZST", 720),
    ("NZDT", 780),
    ("NST", -210),
    ("NDT", -150),
    ("AST", -240),
    ("ADT", -180),
    ("EST", -300),
    ("EDT", -240),
    ("CST", -360),
    ("CDT", -300),
    ("MST", -420),
    ("MDT", -360),
    ("PST", -480),
    ("PDT", -420),
    ("AKST", -540),
    ("AKDT", -480),
    ("HST", -600),
];

/// How the zone of a parsed date was determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneStatus {
    Known(String),
    Missing,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanDate {
    pub date: OffsetDateTime,
    pub zone: ZoneStatus,
}

/// Parse a catalog creation date. Dates without a recognisable zone are taken as UTC.
pub fn parse_human_date(text: &str) -> Result<HumanDate> {
    let normalized = text.replace(',', ", ");
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();

    if tokens.is_empty() {
        return Err(IcloudsortError::InvalidDateFormat("empty date".to_string()));
    }

    let first = tokens[0].trim_end_matches(',').to_lowercase();
    if WEEKDAYS
        .iter()
        .any(|day| *day == first || (first.len() == 3 && day.starts_with(first.as_str())))
    {
        tokens.remove(0);
    }

    let mut zone = ZoneStatus::Missing;
    let mut offset = UtcOffset::UTC;
    if let Some(last) = tokens.last().copied() {
        if let Some(parsed) = parse_zone(last) {
            offset = parsed;
            zone = ZoneStatus::Known(last.to_string());
            tokens.pop();
        } else if is_zone_word(last) {
            zone = ZoneStatus::Unknown(last.to_string());
            tokens.pop();
        }
    }

    let rest = tokens.join(" ");
    let date_time = HUMAN_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(&rest, format).ok())
        .ok_or_else(|| IcloudsortError::InvalidDateFormat(format!("unrecognised date '{}'", text)))?;

    Ok(HumanDate {
        date: date_time.assume_offset(offset),
        zone,
    })
}

/// Offset for a zone token: `Z`, an abbreviation, `±HH:MM`, `±HHMM`, `±HH`, or `GMT±H`.
pub fn parse_zone(token: &str) -> Option<UtcOffset> {
    let upper = token.to_uppercase();

    if let Some((_, minutes)) = ZONE_ABBREVIATIONS.iter().find(|(name, _)| *name == upper) {
        return UtcOffset::from_whole_seconds(minutes * 60).ok();
    }

    let numeric = upper
        .strip_prefix("GMT")
        .or_else(|| upper.strip_prefix("UTC"))
        .unwrap_or(&upper);
    parse_numeric_offset(numeric)
}

fn parse_numeric_offset(s: &str) -> Option<UtcOffset> {
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };

    if hours.is_empty() || !hours.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !minutes.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i8 = hours.parse().ok()?;
    let minutes: i8 = minutes.parse().ok()?;
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

fn is_zone_word(token: &str) -> bool {
    let upper = token.to_uppercase();
    upper != "AM" && upper != "PM" && token.chars().all(|c| c.is_ascii_alphabetic())
}
