//! Resolution of one timezone-aware creation date per asset.
//!
//! Sources are tried strictly in this order, stopping at the first that parses:
//!
//! 1. `SubSecDateTimeOriginal` with fractional seconds and offset, then the same tag
//!    without fractional seconds.
//! 2. `DateTimeOriginal` with `OffsetTimeOriginal`, else `OffsetTime`, else UTC.
//! 3. `CreationDate` with its embedded offset.
//! 4. `CreateDate` with the offset found for step 2, else UTC.
//! 5. The catalog's human-readable creation date (or the file's change time for
//!    untracked files).
//!
//! Nothing here touches the filesystem.

use crate::icloudsort_core::error::{IcloudsortError, Result};
use crate::icloudsort_core::exif::{
    TAG_CREATE_DATE, TAG_CREATION_DATE, TAG_DATE_TIME_ORIGINAL, TAG_OFFSET_TIME,
    TAG_OFFSET_TIME_ORIGINAL, TAG_SUBSEC_DATE_TIME_ORIGINAL, TagMap,
};
use crate::icloudsort_core::human_date::{ZoneStatus, parse_human_date};
use crate::icloudsort_core::record::CatalogDate;
use crate::icloudsort_core::report::Reporter;
use std::borrow::Cow;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// EXIF date with fractional seconds and offset, e.g. `2021:03:26 16:25:20.236-07:00`.
const EXIF_SUBSEC_OFFSET_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]:[month]:[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
);

/// EXIF date with offset, e.g. `2021:03:26 16:25:20-07:00`.
const EXIF_OFFSET_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]:[month]:[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

/// Date format used in EXIF data.
const EXIF_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

const EXIF_SUBSEC_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]:[month]:[day] [hour]:[minute]:[second].[subsecond]");

const EXIF_OFFSET_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Which source produced a resolved date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    SubSecond,
    SubSecondNoFraction,
    OriginalWithOffset,
    CreationDate,
    CreateDate,
    Catalog,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::SubSecond => "SubSecDateTimeOriginal",
            DateSource::SubSecondNoFraction => "SubSecDateTimeOriginal (no fraction)",
            DateSource::OriginalWithOffset => "DateTimeOriginal",
            DateSource::CreationDate => "CreationDate",
            DateSource::CreateDate => "CreateDate",
            DateSource::Catalog => "catalog",
        }
    }
}

impl std::fmt::Display for DateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub date: OffsetDateTime,
    pub source: DateSource,
}

/// Resolve the creation date of `filename` from its tags, falling back to the catalog date.
pub fn resolve(
    filename: &str,
    tags: &TagMap,
    fallback: &CatalogDate,
    reporter: &dyn Reporter,
) -> Result<Resolution> {
    if let Some(value) = tags.get(TAG_SUBSEC_DATE_TIME_ORIGINAL) {
        let value = zulu_as_offset(value);
        if let Ok(date) = OffsetDateTime::parse(&value, EXIF_SUBSEC_OFFSET_FORMAT) {
            return Ok(Resolution {
                date,
                source: DateSource::SubSecond,
            });
        }
        if let Ok(date) = OffsetDateTime::parse(&value, EXIF_OFFSET_DATE_FORMAT) {
            return Ok(Resolution {
                date,
                source: DateSource::SubSecondNoFraction,
            });
        }
        reporter.debug(&format!(
            "{}: unparseable {} '{}'",
            filename, TAG_SUBSEC_DATE_TIME_ORIGINAL, value
        ));
    }

    let offset_tag = tags
        .get(TAG_OFFSET_TIME_ORIGINAL)
        .map(|v| (TAG_OFFSET_TIME_ORIGINAL, v))
        .or_else(|| tags.get(TAG_OFFSET_TIME).map(|v| (TAG_OFFSET_TIME, v)));
    let offset = offset_tag.and_then(|(tag, value)| {
        let parsed = parse_offset(value);
        if parsed.is_none() {
            reporter.warn(&format!("{}: unparseable {} '{}'", filename, tag, value));
        }
        parsed
    });

    if let Some(value) = tags.get(TAG_DATE_TIME_ORIGINAL) {
        if let Some(naive) = parse_naive(value) {
            let offset = offset_or_utc(filename, TAG_DATE_TIME_ORIGINAL, offset, reporter);
            return Ok(Resolution {
                date: naive.assume_offset(offset),
                source: DateSource::OriginalWithOffset,
            });
        }
        reporter.debug(&format!(
            "{}: unparseable {} '{}'",
            filename, TAG_DATE_TIME_ORIGINAL, value
        ));
    }

    if let Some(value) = tags.get(TAG_CREATION_DATE) {
        let value = zulu_as_offset(value);
        if let Some(date) = parse_with_offset(&value) {
            return Ok(Resolution {
                date,
                source: DateSource::CreationDate,
            });
        }
        reporter.debug(&format!(
            "{}: unparseable {} '{}'",
            filename, TAG_CREATION_DATE, value
        ));
    }

    if let Some(value) = tags.get(TAG_CREATE_DATE) {
        if let Some(naive) = parse_naive(value) {
            let offset = offset_or_utc(filename, TAG_CREATE_DATE, offset, reporter);
            return Ok(Resolution {
                date: naive.assume_offset(offset),
                source: DateSource::CreateDate,
            });
        }
        reporter.debug(&format!(
            "{}: unparseable {} '{}'",
            filename, TAG_CREATE_DATE, value
        ));
    }

    resolve_catalog_date(filename, fallback, reporter).map(|date| Resolution {
        date,
        source: DateSource::Catalog,
    })
}

fn resolve_catalog_date(
    filename: &str,
    fallback: &CatalogDate,
    reporter: &dyn Reporter,
) -> Result<OffsetDateTime> {
    match fallback {
        CatalogDate::Timestamp(date) => Ok(*date),
        CatalogDate::Text(text) => {
            let parsed = parse_human_date(text).map_err(|e| {
                IcloudsortError::InvalidDateFormat(format!(
                    "no usable metadata and catalog date '{}' failed to parse ({})",
                    text, e
                ))
            })?;
            match parsed.zone {
                ZoneStatus::Known(_) => {}
                ZoneStatus::Missing => reporter.warn(&format!(
                    "{}: catalog date '{}' has no time zone, assuming UTC",
                    filename, text
                )),
                ZoneStatus::Unknown(zone) => reporter.warn(&format!(
                    "{}: unknown time zone '{}' in catalog date '{}', assuming UTC",
                    filename, zone, text
                )),
            }
            Ok(parsed.date)
        }
    }
}

fn offset_or_utc(
    filename: &str,
    tag: &str,
    offset: Option<UtcOffset>,
    reporter: &dyn Reporter,
) -> UtcOffset {
    offset.unwrap_or_else(|| {
        reporter.warn(&format!(
            "{}: {} has no offset tag, assuming UTC",
            filename, tag
        ));
        UtcOffset::UTC
    })
}

/// Rewrite a trailing `Z` as `+00:00` so the numeric offset formats accept it.
fn zulu_as_offset(value: &str) -> Cow<'_, str> {
    let trimmed = value.trim();
    match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(stripped) => Cow::Owned(format!("{}+00:00", stripped)),
        None => Cow::Borrowed(trimmed),
    }
}

fn parse_offset(value: &str) -> Option<UtcOffset> {
    let value = zulu_as_offset(value);
    UtcOffset::parse(&value, EXIF_OFFSET_FORMAT).ok()
}

fn parse_naive(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    PrimitiveDateTime::parse(value, EXIF_DATE_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(value, EXIF_SUBSEC_DATE_FORMAT))
        .ok()
}

fn parse_with_offset(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, EXIF_OFFSET_DATE_FORMAT)
        .or_else(|_| OffsetDateTime::parse(value, EXIF_SUBSEC_OFFSET_FORMAT))
        .ok()
}
