//! Error kinds for the generation pipeline.
//!
//! Errors are classified by how far they reach:
//! - Fatal before generation: `Ingest`, `CalendarRead`, `Validation`,
//!   `PromptResolution`
//! - Recovered per job: `Generation`

use std::path::PathBuf;
use thiserror::Error;

/// Error types for the dayscore pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// The calendar text could not be parsed
    #[error("Calendar error: {0}")]
    Ingest(String),

    /// The calendar file could not be read
    #[error("Could not read calendar {path}: {source}")]
    CalendarRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// User input was rejected before any work started
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Prompts could not be obtained for the batch
    #[error("Prompt resolution failed: {0}")]
    PromptResolution(String),

    /// A single backend call or clip write failed
    #[error("Generation failed: {0}")]
    Generation(String),
}

impl Error {
    pub fn ingest(msg: impl Into<String>) -> Self {
        Error::Ingest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn prompt(msg: impl Into<String>) -> Self {
        Error::PromptResolution(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Error::Generation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_pick_the_kind() {
        assert!(matches!(Error::generation("backend crashed"), Error::Generation(_)));
        assert!(matches!(Error::ingest("bad"), Error::Ingest(_)));
        assert!(matches!(Error::prompt("bad"), Error::PromptResolution(_)));
    }

    #[test]
    fn test_messages_carry_kind() {
        let err = Error::validation("Duration must be greater than 0");
        assert_eq!(err.to_string(), "Invalid input: Duration must be greater than 0");
    }
}
