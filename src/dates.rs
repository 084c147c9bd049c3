//! Date range parsing and filtering of ingested calendar events.

use crate::activity::Activity;
use crate::calendar::EventsByDate;
use crate::error::{Error, Result};
use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive range of calendar dates.
///
/// `from > to` is allowed and selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn single(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    /// Parse `YYYY-MM-DD` or `YYYY-MM-DD,YYYY-MM-DD`.
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split(',').map(str::trim).collect();
        if parts.len() > 2 {
            return Err(range_format_error(input));
        }
        let dates = parts
            .iter()
            .map(|p| parse_date(p))
            .collect::<Result<Vec<_>>>()
            .map_err(|_| range_format_error(input))?;

        // One date: the range collapses onto it.
        Ok(Self {
            from: dates[0],
            to: dates[dates.len() - 1],
        })
    }

    /// Today's date in local time
    pub fn today() -> Self {
        Self::single(chrono::Local::now().date_naive())
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from.format(DATE_FORMAT))
        } else {
            write!(f, "{} to {}", self.from.format(DATE_FORMAT), self.to.format(DATE_FORMAT))
        }
    }
}

/// Parse a single `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    // chrono accepts unpadded fields; insist on the exact shape.
    let well_formed = input.len() == 10
        && input
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(Error::validation(format!(
            "Date '{input}' must be in the format 'YYYY-MM-DD'"
        )));
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|e| Error::validation(format!("Date '{input}' is not a valid date: {e}")))
}

fn range_format_error(input: &str) -> Error {
    Error::validation(format!(
        "Dates '{input}' must be in the format 'YYYY-MM-DD' or as a range: 'YYYY-MM-DD,YYYY-MM-DD'"
    ))
}

/// Select the buckets whose date lies in `[from, to]`.
pub fn filter_range(events: &EventsByDate, from: NaiveDate, to: NaiveDate) -> EventsByDate {
    if from > to {
        return EventsByDate::new();
    }
    events
        .range(from..=to)
        .map(|(date, bucket)| (*date, bucket.clone()))
        .collect()
}

/// Flatten events into activities, skipping events without a name.
pub fn activities(events: &EventsByDate) -> Vec<Activity> {
    events
        .values()
        .flatten()
        .filter_map(|event| {
            event
                .name()
                .map(|name| Activity::with_span(name, event.duration()))
        })
        .collect()
}

/// Short human form of an event length: `45m`, `2h`, `1h30m`.
pub fn format_span(span: chrono::Duration) -> String {
    let minutes = span.num_minutes().max(0);
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h{m:02}m"),
    }
}
