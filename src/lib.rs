//! Soundtracks and ambience for the activities of a day.
//!
//! dayscore turns activities (free-text descriptions, a batch file, or the
//! events of an iCalendar file) into generation jobs for audio and music
//! synthesis backends. For each job it resolves a prompt, a duration, an
//! output file name and the backend to run on.
//!
//! ## Pipeline
//!
//! ```text
//! .ics file ──► calendar ──► dates (range filter) ──┐
//! text / list / batch file ──► activity ────────────┴─► prompts ──► orchestrator ──► backend ──► audio (.wav)
//! ```
//!
//! Core modules:
//! - [`calendar`] - iCalendar ingestion into events bucketed by date
//! - [`dates`] - Date range parsing and filtering
//! - [`prompts`] - Template and creative prompt resolution
//! - [`orchestrator`] - Job planning, output naming and failure isolation
//! - [`backend`] - Model catalogue and the generator interface
//!
//! ### Supporting Modules
//!
//! - [`activity`] - Activity batches from text and files
//! - [`creative`] - Language model client for creative prompts
//! - [`audio`] - Clip decoding and WAV output
//! - [`config`] - Configuration file and environment overrides
//! - [`error`] - Error kinds of the pipeline
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use dayscore::activity;
//! use dayscore::backend::BackendSelection;
//! use dayscore::orchestrator::{plan_jobs, OutputPolicy};
//! use dayscore::prompts::{resolve_prompts, PromptStrategy};
//!
//! let activities = activity::parse_list("Meeting with Joe, Walk by the beach")?;
//! let names = activity::names(&activities);
//! let prompts = resolve_prompts(&names, &PromptStrategy::Template, false)?;
//!
//! let jobs = plan_jobs(&prompts, &names, &[5, 5], &OutputPolicy::Derived, BackendSelection::Dual)?;
//! assert_eq!(jobs.len(), 4);
//! assert_eq!(jobs[0].output_name, "music_Meeting_with_Joe");
//! # Ok::<(), dayscore::error::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`error::Result`]. Ingest, validation and prompt
//! errors stop a batch before any generation starts; generation errors are
//! recorded per job by [`orchestrator::Orchestrator::run`] and the batch
//! continues.

pub mod activity;
pub mod audio;
pub mod backend;
pub mod calendar;
pub mod cli;
pub mod completion;
pub mod config;
pub mod creative;
pub mod dates;
pub mod error;
pub mod orchestrator;
pub mod prompts;
