//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for dayscore using Clap derive macros.
//!
//! ## Commands
//!
//! - `generate`: Generate clips from free-text descriptions on one backend
//! - `activities`: Score a list of activities or a calendar day with music and ambience
//! - `events`: Show the events of a calendar file per date
//! - `completion`: Print shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! dayscore generate dog barking -d 3
//! dayscore generate -b prompts.txt -m musicgen-small -o take
//! dayscore activities "Meeting with Joe, Gym" --dry-run
//! dayscore activities calendar.ics --dates 2023-11-13,2023-11-17 --gpt
//! dayscore events calendar.ics --dates 2023-11-14
//! ```

use crate::backend::{Model, DEFAULT_AUDIO_MODEL, DEFAULT_MODEL, DEFAULT_MUSIC_MODEL};
use crate::config::OUTPUT_DIR_ENV;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "dayscore")]
#[command(about = "dayscore: Soundtracks and ambience for your day, from text or a calendar")]
#[command(version)]
pub struct Args {
    /// Directory generated clips are written to
    ///
    /// Overrides the configuration file and the environment.
    #[arg(long, global = true, env = OUTPUT_DIR_ENV, value_hint = clap::ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate clips from text descriptions
    ///
    /// All description words form a single prompt. With --batch, every
    /// non-empty line of the file is one prompt.
    ///
    /// Output names default to the description with spaces replaced by
    /// underscores. A single --output names one clip, or numbers a batch
    /// (take_0, take_1, ...). Repeat --output to name every clip.
    Generate {
        /// Description of the sound to generate
        #[arg(value_hint = clap::ValueHint::Other)]
        description: Vec<String>,

        /// Clip duration in seconds
        #[arg(short, long)]
        duration: Option<u32>,

        /// Model to generate with
        #[arg(short, long, value_enum, default_value_t = DEFAULT_MODEL)]
        model: Model,

        /// Output name (without extension), repeatable
        #[arg(short, long)]
        output: Vec<String>,

        /// File with one description per line
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        batch: Option<PathBuf>,

        /// Print the planned jobs without generating
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a soundtrack and ambience for each activity
    ///
    /// SOURCE is either a comma separated list of activities or a path to an
    /// .ics calendar. For a calendar, the events in --dates are used and each
    /// clip's length follows the event's length unless --duration is given.
    Activities {
        /// Comma separated activities or an .ics file
        #[arg(value_hint = clap::ValueHint::AnyPath)]
        source: String,

        /// Ask a language model for creative sound prompts
        #[arg(long)]
        gpt: bool,

        /// Request reproducible prompts from the language model (with --gpt)
        #[arg(long)]
        deterministic: bool,

        /// Date or range of dates: YYYY-MM-DD or YYYY-MM-DD,YYYY-MM-DD (default: today)
        #[arg(long)]
        dates: Option<String>,

        /// Clip duration in seconds
        #[arg(short, long)]
        duration: Option<u32>,

        /// Music model
        #[arg(long, value_enum, default_value_t = DEFAULT_MUSIC_MODEL)]
        music_model: Model,

        /// Ambient audio model
        #[arg(long, value_enum, default_value_t = DEFAULT_AUDIO_MODEL)]
        audio_model: Model,

        /// Print the resolved prompts and planned jobs without generating
        #[arg(long)]
        dry_run: bool,
    },

    /// List the events of a calendar file per date
    Events {
        /// Path to an .ics calendar
        #[arg(value_hint = clap::ValueHint::FilePath)]
        calendar: PathBuf,

        /// Date or range of dates: YYYY-MM-DD or YYYY-MM-DD,YYYY-MM-DD (default: all)
        #[arg(long)]
        dates: Option<String>,
    },

    /// Generate shell completions
    ///
    /// Usage: dayscore completion bash > ~/.local/share/bash-completion/completions/dayscore
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_generate_defaults() {
        let args = Args::try_parse_from(["dayscore", "generate", "dog", "barking"]).unwrap();
        match args.command {
            Command::Generate {
                description,
                duration,
                model,
                output,
                batch,
                dry_run,
            } => {
                assert_eq!(description, vec!["dog", "barking"]);
                assert_eq!(duration, None);
                assert_eq!(model, Model::AudiogenMedium);
                assert!(output.is_empty());
                assert!(batch.is_none());
                assert!(!dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_repeated_output() {
        let args = Args::try_parse_from([
            "dayscore", "generate", "-b", "list.txt", "-o", "x", "-o", "y", "-m", "musicgen-small",
        ])
        .unwrap();
        match args.command {
            Command::Generate { output, model, .. } => {
                assert_eq!(output, vec!["x", "y"]);
                assert_eq!(model, Model::MusicgenSmall);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_activities_flags() {
        let args = Args::try_parse_from([
            "dayscore",
            "activities",
            "cal.ics",
            "--gpt",
            "--deterministic",
            "--dates",
            "2023-11-14",
        ])
        .unwrap();
        match args.command {
            Command::Activities {
                source,
                gpt,
                deterministic,
                dates,
                music_model,
                audio_model,
                ..
            } => {
                assert_eq!(source, "cal.ics");
                assert!(gpt && deterministic);
                assert_eq!(dates.as_deref(), Some("2023-11-14"));
                assert_eq!(music_model, Model::MusicgenMedium);
                assert_eq!(audio_model, Model::AudiogenMedium);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_deterministic_alone_parses() {
        let args = Args::try_parse_from(["dayscore", "activities", "Gym", "--deterministic"]);
        match args.unwrap().command {
            Command::Activities {
                gpt, deterministic, ..
            } => assert!(deterministic && !gpt),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_model_rejected() {
        let args = ["dayscore", "generate", "x", "-m", "musicgen-huge"];
        assert!(Args::try_parse_from(args).is_err());
    }
}
