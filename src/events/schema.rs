//! Event feed schema: header aliases, column binding and value parsing.
//!
//! Headers are matched case-insensitively; column order does not matter and
//! columns nobody asks for are ignored.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::csv::clean_field;

/// Epoch values above this are milliseconds, everything else is seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const COLUMN_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Title,
    StartTime,
    EndTime,
    Latitude,
    Longitude,
    Category,
    Venue,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Id,
        Column::Title,
        Column::StartTime,
        Column::EndTime,
        Column::Latitude,
        Column::Longitude,
        Column::Category,
        Column::Venue,
    ];

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Id => &["id", "event_id"],
            Column::Title => &["title", "event_title", "name"],
            Column::StartTime => &["start_time", "start", "start_datetime", "startdate", "date_start"],
            Column::EndTime => &["end_time", "end", "end_datetime", "enddate", "date_end"],
            Column::Latitude => &["latitude", "lat"],
            Column::Longitude => &["longitude", "lon", "lng", "long"],
            Column::Category => &["category", "type", "tags"],
            Column::Venue => &["venue", "location", "place"],
        }
    }

    fn matches(self, header: &str) -> bool {
        self.aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(header))
    }
}

/// Logical column -> raw column index, resolved once per feed from its header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [Option<usize>; COLUMN_COUNT],
}

impl ColumnMap {
    pub fn from_header(header: &[String]) -> Self {
        let cleaned: Vec<&str> = header
            .iter()
            .map(|h| clean_field(h.trim_start_matches('\u{feff}')))
            .collect();

        let mut map = Self::default();
        for (slot, column) in Column::ALL.iter().enumerate() {
            map.indices[slot] = cleaned.iter().position(|h| column.matches(h));
        }
        map
    }

    pub fn index_of(&self, column: Column) -> Option<usize> {
        let slot = Column::ALL.iter().position(|c| *c == column)?;
        self.indices[slot]
    }

    pub fn is_bound(&self, column: Column) -> bool {
        self.index_of(column).is_some()
    }

    /// Cleaned value of `column` in `row`, or `""` when unbound or out of range.
    pub fn get<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        self.index_of(column)
            .and_then(|idx| row.get(idx))
            .map(|raw| clean_field(raw))
            .unwrap_or("")
    }
}

type NaiveFormat = &'static str;

/// ISO-8601 date-time without an offset; the zoned variants go through
/// [`DateTime::parse_from_rfc3339`] and the offset formats below first.
const ISO_NAIVE_FORMATS: [NaiveFormat; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const ISO_OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

/// Remaining candidates, tried in order, all read as UTC.
const FALLBACK_FORMATS: [NaiveFormat; 3] = ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M", "%m/%d/%Y %H:%M"];

/// Parse an absolute time. Candidate formats are tried in order and the
/// first match wins; if none matches the value is read as epoch
/// milliseconds (above 10^12) or epoch seconds.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let value = clean_field(raw);
    if value.is_empty() {
        return None;
    }

    parse_iso(value)
        .or_else(|| {
            FALLBACK_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| parse_epoch(value))
}

fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // `%:z` does not accept a `Z` designator
    let zulu = value
        .strip_suffix(|c: char| c == 'Z' || c == 'z')
        .map(|head| format!("{head}+00:00"));
    let zoned = zulu.as_deref().unwrap_or(value);
    if let Some(dt) = ISO_OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(zoned, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    ISO_NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_epoch(value: &str) -> Option<DateTime<Utc>> {
    let raw: i64 = value.parse().ok()?;
    if raw > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

/// Finite floating point value, or `None`.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    clean_field(raw)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Non-blank cleaned value, or `None`.
pub fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
