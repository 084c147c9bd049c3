//! Activity batches: the ordered list of things to generate sound for.
//!
//! A batch comes from free text on the command line, a batch file with one
//! description per line, a comma separated list, or a calendar (see
//! [`crate::dates::activities`]).

use crate::error::{Error, Result};
use chrono::Duration;
use log::debug;
use std::path::Path;

/// One activity to turn into a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub name: String,
    /// How long the activity lasts, when it came from a calendar
    pub span: Option<Duration>,
}

impl Activity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: None,
        }
    }

    pub fn with_span(name: impl Into<String>, span: Duration) -> Self {
        Self {
            name: name.into(),
            span: Some(span),
        }
    }
}

/// Join description words into a single activity.
pub fn from_words(words: &[String]) -> Result<Vec<Activity>> {
    let description = words.join(" ");
    if description.trim().is_empty() {
        return Err(Error::validation(
            "Description argument is required when not using --batch",
        ));
    }
    Ok(vec![Activity::new(description.trim())])
}

/// Split a comma separated activity list.
pub fn parse_list(list: &str) -> Result<Vec<Activity>> {
    let activities: Vec<Activity> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Activity::new)
        .collect();
    if activities.is_empty() {
        return Err(Error::validation(format!("No activities found in '{list}'")));
    }
    Ok(activities)
}

/// Read one description per line; blank lines are skipped.
pub fn read_batch_file(path: &Path) -> Result<Vec<Activity>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::validation(format!("Could not read batch file {}: {e}", path.display()))
    })?;
    let activities: Vec<Activity> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Activity::new)
        .collect();
    if activities.is_empty() {
        return Err(Error::validation(format!(
            "Batch file {} contains no descriptions",
            path.display()
        )));
    }
    debug!("Read {} descriptions from {}", activities.len(), path.display());
    Ok(activities)
}

/// A source ending in `.ics` is a calendar; anything else is a list.
pub fn is_calendar_source(source: &str) -> bool {
    source.trim().to_ascii_lowercase().ends_with(".ics")
}

pub fn names(activities: &[Activity]) -> Vec<String> {
    activities.iter().map(|a| a.name.clone()).collect()
}
