//! # Generation Orchestrator
//!
//! Turns resolved prompts into generation jobs and runs them.
//!
//! ## Planning
//!
//! [`plan_jobs`] is pure. For each prompt it decides the duration, the
//! output name and the backend. In [`BackendSelection::Dual`] mode every
//! prompt yields a soundtrack job and an ambience job. All music jobs are
//! planned before all ambient jobs, so a backend is reconfigured at most once
//! per run of equal durations.
//!
//! ## Output names
//!
//! | Policy                    | Batch of 1 | Batch of n, item `i` |
//! |---------------------------|------------|----------------------|
//! | `Derived`                 | `names[0]` | `names[i]`           |
//! | `Single(base)`            | `base`     | `base_i`             |
//! | `PerItem(list)`           | `list[0]`  | `list[i]`            |
//!
//! Names are sanitized: spaces and path separators become `_`. Dual mode
//! prefixes `music_` or `audio_`.
//!
//! ## Running
//!
//! [`Orchestrator::run`] executes jobs sequentially in plan order. A failed
//! job is logged and recorded; the rest of the batch still runs.

use crate::activity::Activity;
use crate::audio;
use crate::backend::{BackendKind, BackendSelection, GenerationBackend};
use crate::error::{Error, Result};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;

/// Default clip length when the user gives none
pub const DEFAULT_DURATION: u32 = 5;

/// How output file names are chosen for a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Use each activity's own name
    Derived,
    /// One base name for the whole batch
    Single(String),
    /// One name per activity, in order
    PerItem(Vec<String>),
}

impl OutputPolicy {
    /// Policy for zero, one or several `--output` values
    pub fn from_values(values: Vec<String>) -> Self {
        match values.len() {
            0 => OutputPolicy::Derived,
            1 => values
                .into_iter()
                .next()
                .map_or(OutputPolicy::Derived, OutputPolicy::Single),
            _ => OutputPolicy::PerItem(values),
        }
    }
}

/// How clip durations are chosen for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPolicy {
    /// Same length for every clip
    Fixed(u32),
    /// Scale each activity's calendar span, `fallback` for activities
    /// without one
    Scaled {
        seconds_per_clip_second: u32,
        fallback: u32,
    },
}

impl DurationPolicy {
    pub fn seconds_for(&self, activity: &Activity) -> u32 {
        match *self {
            DurationPolicy::Fixed(seconds) => seconds,
            DurationPolicy::Scaled {
                seconds_per_clip_second,
                fallback,
            } => activity
                .span
                .map(|span| clip_seconds(span.num_seconds(), seconds_per_clip_second))
                .unwrap_or(fallback),
        }
    }

    pub fn durations(&self, activities: &[Activity]) -> Vec<u32> {
        activities.iter().map(|a| self.seconds_for(a)).collect()
    }
}

/// Seconds of audio for an event lasting `event_seconds`: floor division by
/// the scaling factor, never below one second.
pub fn clip_seconds(event_seconds: i64, seconds_per_clip_second: u32) -> u32 {
    let factor = i64::from(seconds_per_clip_second.max(1));
    let seconds = (event_seconds / factor).clamp(1, i64::from(u32::MAX));
    seconds as u32
}

/// Reject a zero duration before any work starts.
pub fn validate_duration(seconds: u32) -> Result<u32> {
    if seconds == 0 {
        return Err(Error::validation("Duration must be greater than 0"));
    }
    Ok(seconds)
}

/// Replace spaces and path separators so the name is a single file name.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Output name for item `index` of a batch of `names`.
pub fn resolve_output_name(
    policy: &OutputPolicy,
    names: &[String],
    index: usize,
) -> Result<String> {
    let raw = match policy {
        OutputPolicy::Derived => names
            .get(index)
            .cloned()
            .ok_or_else(|| Error::validation(format!("No activity at position {index}")))?,
        OutputPolicy::Single(base) if names.len() <= 1 => base.clone(),
        OutputPolicy::Single(base) => format!("{base}_{index}"),
        OutputPolicy::PerItem(list) => {
            if list.len() != names.len() {
                return Err(Error::validation(format!(
                    "Got {} output names for {} activities",
                    list.len(),
                    names.len()
                )));
            }
            list.get(index)
                .cloned()
                .ok_or_else(|| Error::validation(format!("No output name at position {index}")))?
        }
    };

    let name = sanitize_name(&raw);
    if name.is_empty() {
        return Err(Error::validation(format!(
            "Output name for activity {} is empty",
            index + 1
        )));
    }
    Ok(name)
}

/// One planned call to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    /// Position of the source activity in the batch
    pub index: usize,
    pub backend: BackendKind,
    pub prompt: String,
    pub duration: u32,
    pub output_name: String,
}

impl GenerationJob {
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.output_name)
    }
}

/// Wrap a prompt for its backend when both backends share one description.
fn frame_prompt(kind: BackendKind, prompt: &str) -> String {
    match kind {
        BackendKind::Music => format!("Soundtrack for: {prompt}"),
        BackendKind::Ambient => format!("Background sounds of: {prompt}"),
    }
}

/// Plan the jobs for a batch.
///
/// `prompts`, `names` and `durations` are parallel lists, one entry per
/// activity.
///
/// # Errors
///
/// [`Error::Validation`] if the lists differ in length, a duration is zero,
/// or the output policy does not fit the batch.
pub fn plan_jobs(
    prompts: &[String],
    names: &[String],
    durations: &[u32],
    policy: &OutputPolicy,
    selection: BackendSelection,
) -> Result<Vec<GenerationJob>> {
    if prompts.len() != names.len() || durations.len() != names.len() {
        return Err(Error::validation(format!(
            "Mismatched batch: {} prompts, {} names, {} durations",
            prompts.len(),
            names.len(),
            durations.len()
        )));
    }
    for &duration in durations {
        validate_duration(duration)?;
    }

    let output_names = (0..names.len())
        .map(|i| resolve_output_name(policy, names, i))
        .collect::<Result<Vec<_>>>()?;

    let dual = selection == BackendSelection::Dual;
    let mut jobs = Vec::with_capacity(names.len() * selection.kinds().len());
    for &kind in selection.kinds() {
        for (index, prompt) in prompts.iter().enumerate() {
            let (prompt, output_name) = if dual {
                (
                    frame_prompt(kind, prompt),
                    format!("{}{}", kind.prefix(), output_names[index]),
                )
            } else {
                (prompt.clone(), output_names[index].clone())
            };
            jobs.push(GenerationJob {
                index,
                backend: kind,
                prompt,
                duration: durations[index],
                output_name,
            });
        }
    }

    let mut seen = HashSet::new();
    for job in &jobs {
        if !seen.insert(job.output_name.as_str()) {
            warn!("Several activities write to {}; the last one wins", job.file_name());
        }
    }

    debug!("Planned {} jobs for {} activities", jobs.len(), names.len());
    Ok(jobs)
}

/// Outcome of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Written(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: GenerationJob,
    pub status: JobStatus,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Written(_))
    }
}

/// Number of (written, failed) jobs
pub fn summarize(reports: &[JobReport]) -> (usize, usize) {
    let written = reports.iter().filter(|r| r.is_success()).count();
    (written, reports.len() - written)
}

/// Runs planned jobs against exclusively held backends.
pub struct Orchestrator<'a> {
    music: Option<&'a mut dyn GenerationBackend>,
    ambient: Option<&'a mut dyn GenerationBackend>,
    output_dir: PathBuf,
}

impl<'a> Orchestrator<'a> {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            music: None,
            ambient: None,
            output_dir: output_dir.into(),
        }
    }

    /// Attach a backend in the slot matching its kind.
    pub fn with_backend(mut self, backend: &'a mut dyn GenerationBackend) -> Self {
        match backend.kind() {
            BackendKind::Music => self.music = Some(backend),
            BackendKind::Ambient => self.ambient = Some(backend),
        }
        self
    }

    /// Run every job in order, one report per job.
    pub fn run(&mut self, jobs: &[GenerationJob]) -> Vec<JobReport> {
        let mut music_duration = None;
        let mut ambient_duration = None;
        let mut reports = Vec::with_capacity(jobs.len());

        for (n, job) in jobs.iter().enumerate() {
            let (slot, configured) = match job.backend {
                BackendKind::Music => (self.music.as_deref_mut(), &mut music_duration),
                BackendKind::Ambient => (self.ambient.as_deref_mut(), &mut ambient_duration),
            };

            let status = match slot {
                None => {
                    let msg = format!("No {} backend available", job.backend.label());
                    error!("Job {} ({}): {msg}", n + 1, job.output_name);
                    JobStatus::Failed(msg)
                }
                Some(backend) => {
                    if *configured != Some(job.duration) {
                        backend.set_duration(job.duration);
                        *configured = Some(job.duration);
                    }
                    info!(
                        "[{}/{}] {} '{}' -> {}",
                        n + 1,
                        jobs.len(),
                        backend.name(),
                        job.prompt,
                        job.file_name()
                    );
                    let path = self.output_dir.join(job.file_name());
                    let expected_rate = backend.sample_rate();
                    let written = backend.generate(&job.prompt).and_then(|clip| {
                        if clip.sample_rate != expected_rate {
                            return Err(Error::generation(format!(
                                "{} returned {} Hz audio, expected {expected_rate} Hz",
                                backend.name(),
                                clip.sample_rate
                            )));
                        }
                        audio::write_wav(&path, &clip)
                    });
                    match written {
                        Ok(()) => JobStatus::Written(path),
                        Err(e) => {
                            error!("Failed to generate {}: {e}", job.file_name());
                            JobStatus::Failed(e.to_string())
                        }
                    }
                }
            };

            reports.push(JobReport {
                job: job.clone(),
                status,
            });
        }

        reports
    }
}
