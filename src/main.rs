//! # dayscore
//!
//! Generates soundtracks and ambience for activities, from text or from an
//! iCalendar file.
//!
//! ## Usage
//!
//! ```bash
//! # One clip from a description
//! dayscore generate dog barking -d 3
//!
//! # Music and ambience for today's events
//! dayscore activities ~/calendar.ics
//!
//! # Creative prompts for a list of activities, without generating
//! dayscore activities "Commute to work, Walk by the beach" --gpt --dry-run
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use dayscore::activity::{self, Activity};
use dayscore::backend::{BackendKind, BackendSelection, CommandBackend, Model};
use dayscore::calendar;
use dayscore::cli::{self, Command};
use dayscore::completion;
use dayscore::config::RuntimeConfig;
use dayscore::creative::OpenAiCompleter;
use dayscore::dates::{self, DateRange};
use dayscore::orchestrator::{
    self, DurationPolicy, GenerationJob, JobReport, JobStatus, Orchestrator, OutputPolicy,
    DEFAULT_DURATION,
};
use dayscore::prompts::{resolve_prompts, PromptStrategy};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Main entry point for dayscore.
///
/// Logging is controlled via `RUST_LOG` and defaults to warnings:
/// - `RUST_LOG=info dayscore activities cal.ics` - Show job progress
/// - `RUST_LOG=dayscore::creative=debug dayscore ...` - Show model replies
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = cli::Args::parse();

    match args.command {
        Command::Generate {
            description,
            duration,
            model,
            output,
            batch,
            dry_run,
        } => {
            let config = load_config(args.output_dir)?;
            let batch = batch.as_deref();
            run_generate(&config, &description, duration, model, output, batch, dry_run)?;
        }
        Command::Activities {
            source,
            gpt,
            deterministic,
            dates,
            duration,
            music_model,
            audio_model,
            dry_run,
        } => {
            let config = load_config(args.output_dir)?;
            let request = ActivitiesRequest {
                source,
                gpt,
                deterministic,
                dates,
                duration,
                music_model,
                audio_model,
                dry_run,
            };
            run_activities(&config, request)?;
        }
        Command::Events { calendar, dates } => {
            show_events(&calendar, dates.as_deref())?;
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            let shell = completion::shell_to_completion_shell(&shell);
            completion::generate_completions(shell, &mut cmd);
        }
    }

    Ok(())
}

fn load_config(output_dir: Option<PathBuf>) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::load().context("Failed to load configuration")?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    debug!("Runtime configuration: {config:?}");
    Ok(config)
}

/// Explicit duration, or the default with a warning.
fn fixed_duration(duration: Option<u32>) -> Result<u32> {
    match duration {
        Some(seconds) => Ok(orchestrator::validate_duration(seconds)?),
        None => {
            warn!("Duration not specified, defaulting to {DEFAULT_DURATION} seconds");
            Ok(DEFAULT_DURATION)
        }
    }
}

fn run_generate(
    config: &RuntimeConfig,
    description: &[String],
    duration: Option<u32>,
    model: Model,
    output: Vec<String>,
    batch: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let activities = match batch {
        Some(path) => {
            if !description.is_empty() {
                warn!("Ignoring description arguments because --batch was given");
            }
            activity::read_batch_file(path)?
        }
        None => activity::from_words(description)?,
    };
    let duration = fixed_duration(duration)?;

    let names = activity::names(&activities);
    let selection = match model.kind() {
        BackendKind::Music => BackendSelection::Music,
        BackendKind::Ambient => BackendSelection::Ambient,
    };
    let jobs = orchestrator::plan_jobs(
        &names,
        &names,
        &vec![duration; names.len()],
        &OutputPolicy::from_values(output),
        selection,
    )?;

    if dry_run {
        print_plan(config, &jobs);
        return Ok(());
    }

    let sample_rate = config.sample_rate(model.kind());
    let mut backend = CommandBackend::new(&config.generator, model, sample_rate)?;
    let reports = Orchestrator::new(&config.output_dir)
        .with_backend(&mut backend)
        .run(&jobs);
    finish(config, &reports)
}

struct ActivitiesRequest {
    source: String,
    gpt: bool,
    deterministic: bool,
    dates: Option<String>,
    duration: Option<u32>,
    music_model: Model,
    audio_model: Model,
    dry_run: bool,
}

fn run_activities(config: &RuntimeConfig, request: ActivitiesRequest) -> Result<()> {
    anyhow::ensure!(
        request.music_model.kind() == BackendKind::Music,
        "{} is not a music model",
        request.music_model
    );
    anyhow::ensure!(
        request.audio_model.kind() == BackendKind::Ambient,
        "{} is not an ambient audio model",
        request.audio_model
    );

    let (activities, duration_policy) = if activity::is_calendar_source(&request.source) {
        let range = match request.dates.as_deref() {
            Some(dates) => DateRange::parse(dates)?,
            None => DateRange::today(),
        };
        let activities = calendar_activities(Path::new(&request.source), &range)?;
        if activities.is_empty() {
            println!("No events found for {range}");
            return Ok(());
        }
        let policy = match request.duration {
            Some(seconds) => DurationPolicy::Fixed(orchestrator::validate_duration(seconds)?),
            None => DurationPolicy::Scaled {
                seconds_per_clip_second: config.seconds_per_clip_second,
                fallback: DEFAULT_DURATION,
            },
        };
        (activities, policy)
    } else {
        if request.dates.is_some() {
            warn!("--dates only applies to calendar files");
        }
        let activities = activity::parse_list(&request.source)?;
        (activities, DurationPolicy::Fixed(fixed_duration(request.duration)?))
    };

    if request.deterministic && !request.gpt {
        warn!("--deterministic only applies with --gpt, template prompts are always reproducible");
    }

    let names = activity::names(&activities);
    let completer;
    let strategy = if request.gpt {
        completer = OpenAiCompleter::from_config(&config.llm)?;
        PromptStrategy::Creative(&completer)
    } else {
        PromptStrategy::Template
    };
    let prompts = resolve_prompts(&names, &strategy, request.deterministic)
        .context("Could not resolve prompts for the activities")?;

    println!("Prompts ({}):", strategy.label());
    for (name, prompt) in names.iter().zip(&prompts) {
        println!("  {name} -> {prompt}");
    }

    let jobs = orchestrator::plan_jobs(
        &prompts,
        &names,
        &duration_policy.durations(&activities),
        &OutputPolicy::Derived,
        BackendSelection::Dual,
    )?;

    if request.dry_run {
        print_plan(config, &jobs);
        return Ok(());
    }

    let mut music = CommandBackend::new(
        &config.generator,
        request.music_model,
        config.sample_rate(BackendKind::Music),
    )?;
    let mut ambient = CommandBackend::new(
        &config.generator,
        request.audio_model,
        config.sample_rate(BackendKind::Ambient),
    )?;
    let reports = Orchestrator::new(&config.output_dir)
        .with_backend(&mut music)
        .with_backend(&mut ambient)
        .run(&jobs);
    finish(config, &reports)
}

fn calendar_activities(path: &Path, range: &DateRange) -> Result<Vec<Activity>> {
    let events = calendar::ingest_file(path)?;
    let selected = dates::filter_range(&events, range.from, range.to);
    info!(
        "{} of {} dates in {} fall in {range}",
        selected.len(),
        events.len(),
        path.display()
    );
    Ok(dates::activities(&selected))
}

fn show_events(path: &Path, range: Option<&str>) -> Result<()> {
    let events = calendar::ingest_file(path)?;
    let events = match range {
        Some(range) => {
            let range = DateRange::parse(range)?;
            dates::filter_range(&events, range.from, range.to)
        }
        None => events,
    };

    if events.is_empty() {
        println!("No events found");
        return Ok(());
    }

    for (date, bucket) in &events {
        println!("{}", date.format("%A %Y-%m-%d"));
        for event in bucket {
            println!(
                "  {} - {}  {:>6}  {}",
                event.start().format("%H:%M"),
                event.end().format("%H:%M"),
                dates::format_span(event.duration()),
                event.name().unwrap_or("(untitled)")
            );
        }
    }
    Ok(())
}

fn print_plan(config: &RuntimeConfig, jobs: &[GenerationJob]) {
    println!(
        "Planned {} jobs, writing to {}:",
        jobs.len(),
        config.absolute_output_dir().display()
    );
    for (n, job) in jobs.iter().enumerate() {
        println!(
            "  {:>2}. [{} {}s] {} <- \"{}\"",
            n + 1,
            job.backend.label(),
            job.duration,
            job.file_name(),
            job.prompt
        );
    }
}

/// Report every job and fail only if nothing was written.
fn finish(config: &RuntimeConfig, reports: &[JobReport]) -> Result<()> {
    for report in reports {
        match &report.status {
            JobStatus::Written(path) => println!("Wrote {}", path.display()),
            JobStatus::Failed(msg) => eprintln!("Failed {}: {msg}", report.job.file_name()),
        }
    }

    let (written, failed) = orchestrator::summarize(reports);
    println!(
        "{written} of {} clips written to {}",
        reports.len(),
        config.absolute_output_dir().display()
    );
    if written == 0 && failed > 0 {
        anyhow::bail!("All {failed} generation jobs failed");
    }
    Ok(())
}
