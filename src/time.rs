//! # CF Time Decoding
//!
//! NetCDF time axes are stored as numbers with a CF-style `units` attribute
//! such as `"days since 1950-01-01 00:00:00 UTC"`. This module turns them into
//! UTC timestamps and produces the monthly tick instants used on the
//! profile-index-vs-time panel.

use crate::error::{QcPlotError, QcPlotResult};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Tick label format for calendar axes (day/month/two-digit year).
pub const TICK_FORMAT: &str = "%d/%m/%y";

/// Time units understood in a CF `units` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn from_cf(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" | "s" => Some(TimeUnit::Seconds),
            "minute" | "minutes" | "min" | "mins" => Some(TimeUnit::Minutes),
            "hour" | "hours" | "hr" | "hrs" | "h" => Some(TimeUnit::Hours),
            "day" | "days" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => 86_400.0,
        }
    }
}

/// Parsed `"<unit> since <reference>"` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> QcPlotResult<Self> {
        let lowered = units.trim();
        let (unit_word, reference) = lowered
            .split_once(" since ")
            .ok_or_else(|| QcPlotError::Time(format!("expected '<unit> since <date>', got '{}'", units)))?;

        let unit = TimeUnit::from_cf(unit_word.trim())
            .ok_or_else(|| QcPlotError::Time(format!("unsupported time unit '{}'", unit_word.trim())))?;
        let reference = parse_reference(reference.trim())?;

        Ok(CfTimeUnits { unit, reference })
    }

    pub fn decode(&self, value: f64) -> QcPlotResult<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(QcPlotError::Time(format!("non-finite time value {}", value)));
        }
        let millis = (value * self.unit.seconds() * 1_000.0).round() as i64;
        self.reference
            .checked_add_signed(Duration::milliseconds(millis))
            .ok_or_else(|| QcPlotError::Time(format!("time value {} overflows the calendar", value)))
    }

    pub fn decode_all(&self, values: &[f64]) -> QcPlotResult<Vec<DateTime<Utc>>> {
        values.iter().map(|v| self.decode(*v)).collect()
    }
}

fn parse_reference(text: &str) -> QcPlotResult<DateTime<Utc>> {
    let cleaned = text
        .trim_end_matches(" UTC")
        .trim_end_matches(" utc")
        .trim_end_matches('Z')
        .trim();

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(cleaned, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| QcPlotError::Time(format!("unparseable reference date '{}'", text)))
}

/// First-of-month instants (00:00 UTC) inside `[start, end]`.
pub fn monthly_ticks(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut ticks = Vec::new();
    if end < start {
        return ticks;
    }

    let (mut year, mut month) = (start.year(), start.month());
    loop {
        let Some(tick) = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
        else {
            break;
        };
        if tick > end {
            break;
        }
        if tick >= start {
            ticks.push(tick);
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    ticks
}

pub fn format_tick(instant: &DateTime<Utc>) -> String {
    instant.format(TICK_FORMAT).to_string()
}
