//! # Calendar Ingestion Module
//!
//! Reads iCalendar (RFC 5545) data and buckets its events by the calendar
//! date of their start time.
//!
//! Only what the pipeline needs is interpreted: `VEVENT` components and their
//! `DTSTART`, `DTEND` and `SUMMARY` properties. Everything else is walked over
//! for structural validity and ignored.
//!
//! ## Timestamps
//!
//! - `20251208` - date only, taken as the start of that day
//! - `20251208T140000` - floating or `TZID=` local time, kept as written
//! - `20251208T140000Z` - UTC, kept as the UTC wall clock
//!
//! ## Example
//!
//! ```
//! use dayscore::calendar;
//!
//! let ics = "BEGIN:VCALENDAR\r\n\
//!            BEGIN:VEVENT\r\n\
//!            SUMMARY:Meeting with Joe\r\n\
//!            DTSTART:20240115T090000\r\n\
//!            DTEND:20240115T100000\r\n\
//!            END:VEVENT\r\n\
//!            END:VCALENDAR\r\n";
//!
//! let events = calendar::ingest(ics)?;
//! assert_eq!(events.len(), 1);
//! # Ok::<(), dayscore::error::Error>(())
//! ```

use crate::error::{Error, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Events grouped by the date they start on, in chronological date order.
/// Events inside one date keep the order they appear in the calendar.
pub type EventsByDate = BTreeMap<NaiveDate, Vec<Event>>;

/// A single calendar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: Option<String>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    duration: Duration,
}

impl Event {
    /// Create an event, rejecting an end before the start.
    pub fn new(name: Option<String>, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end < start {
            return Err(Error::ingest(format!(
                "Event '{}' ends ({end}) before it starts ({start})",
                name.as_deref().unwrap_or("<unnamed>")
            )));
        }
        Ok(Self {
            name,
            start,
            end,
            duration: end - start,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The bucket key for this event
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

/// Read and ingest a calendar file.
pub fn ingest_file(path: &Path) -> Result<EventsByDate> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::CalendarRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes of calendar data from {}", text.len(), path.display());
    ingest(&text)
}

/// Parse calendar text into events grouped by start date.
///
/// # Errors
///
/// Returns [`Error::Ingest`] if the text is not a calendar, components are
/// unbalanced, or an event lacks a valid start or end.
pub fn ingest(text: &str) -> Result<EventsByDate> {
    // Some Windows exporters prefix a byte-order mark.
    let text = text.trim_start_matches('\u{feff}');
    let lines = unfold(text);
    let mut iter = lines.iter();

    match iter.next().map(|l| ContentLine::parse(l)) {
        Some(Ok(first)) if first.is_begin("VCALENDAR") => {}
        _ => return Err(Error::ingest("Not an iCalendar resource (missing BEGIN:VCALENDAR)")),
    }

    let mut stack: Vec<String> = vec!["VCALENDAR".to_string()];
    let mut current: Option<EventBuilder> = None;
    let mut events = EventsByDate::new();
    let mut count = 0usize;

    for raw in iter {
        let line = ContentLine::parse(raw)?;

        if line.name == "BEGIN" {
            let component = line.value.to_ascii_uppercase();
            if component == "VEVENT" && stack.last().map(String::as_str) != Some("VEVENT") {
                current = Some(EventBuilder::default());
            }
            stack.push(component);
            continue;
        }

        if line.name == "END" {
            let component = line.value.to_ascii_uppercase();
            match stack.pop() {
                Some(open) if open == component => {}
                Some(open) => {
                    return Err(Error::ingest(format!(
                        "Unbalanced calendar: END:{component} closes BEGIN:{open}"
                    )))
                }
                None => {
                    return Err(Error::ingest(format!(
                        "Unbalanced calendar: END:{component} after calendar end"
                    )))
                }
            }
            if component == "VEVENT" && !stack.iter().any(|c| c == "VEVENT") {
                if let Some(builder) = current.take() {
                    let event = builder.build()?;
                    events.entry(event.date()).or_default().push(event);
                    count += 1;
                }
            }
            continue;
        }

        if stack.is_empty() {
            return Err(Error::ingest(format!("Property {} outside of VCALENDAR", line.name)));
        }

        // Properties of nested components (VALARM) do not belong to the event.
        if stack.last().map(String::as_str) == Some("VEVENT") {
            if let Some(builder) = current.as_mut() {
                builder.apply(line)?;
            }
        }
    }

    if !stack.is_empty() {
        return Err(Error::ingest(format!(
            "Unterminated calendar: missing END:{}",
            stack.last().map(String::as_str).unwrap_or("VCALENDAR")
        )));
    }

    debug!("Ingested {count} events across {} dates", events.len());
    Ok(events)
}

/// Join folded content lines. Continuation lines start with a space or tab.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.trim().is_empty() {
            lines.push(raw.to_string());
        }
    }
    lines
}

/// One `NAME;PARAM=VALUE:value` line
#[derive(Debug)]
struct ContentLine {
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl ContentLine {
    fn parse(line: &str) -> Result<Self> {
        // The value starts at the first colon outside a quoted parameter value.
        let mut in_quotes = false;
        let mut split_at = None;
        for (i, c) in line.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                ':' if !in_quotes => {
                    split_at = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let split_at =
            split_at.ok_or_else(|| Error::ingest(format!("Malformed content line: '{line}'")))?;

        let (head, value) = (&line[..split_at], &line[split_at + 1..]);
        let mut parts = head.split(';');
        let name = parts.next().unwrap_or_default().trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(Error::ingest(format!("Malformed content line: '{line}'")));
        }
        let params = parts
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.trim().to_ascii_uppercase(), v.trim_matches('"').to_string()))
            .collect();

        Ok(Self {
            name,
            params,
            value: value.to_string(),
        })
    }

    fn is_begin(&self, component: &str) -> bool {
        self.name == "BEGIN" && self.value.eq_ignore_ascii_case(component)
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct EventBuilder {
    summary: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl EventBuilder {
    fn apply(&mut self, line: ContentLine) -> Result<()> {
        match line.name.as_str() {
            "SUMMARY" => {
                let text = unescape_text(&line.value);
                self.summary = (!text.trim().is_empty()).then_some(text);
            }
            "DTSTART" => self.start = Some(parse_timestamp(&line)?),
            "DTEND" => self.end = Some(parse_timestamp(&line)?),
            _ => {}
        }
        Ok(())
    }

    fn build(self) -> Result<Event> {
        let label = self.summary.clone().unwrap_or_else(|| "<unnamed>".to_string());
        let start = self
            .start
            .ok_or_else(|| Error::ingest(format!("Event '{label}' has no DTSTART")))?;
        let end = self
            .end
            .ok_or_else(|| Error::ingest(format!("Event '{label}' has no DTEND")))?;
        Event::new(self.summary, start, end)
    }
}

fn parse_timestamp(line: &ContentLine) -> Result<NaiveDateTime> {
    let value = line.value.trim();
    let is_date = line.param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || value.len() == 8;

    let parsed = if is_date {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    } else {
        let value = value.strip_suffix('Z').unwrap_or(value);
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()
    };

    parsed.ok_or_else(|| {
        Error::ingest(format!("Invalid {} timestamp: '{}'", line.name, line.value))
    })
}

/// Decode RFC 5545 TEXT escapes.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
