//! # Generation Backend Module
//!
//! Catalogue of supported models and the interface to the programs that
//! synthesize audio from text.
//!
//! ## Design Decision: external generator process
//!
//! Neural synthesis runs outside this crate. [`CommandBackend`] runs a
//! configured generator command once per prompt:
//!
//! ```text
//! <generator> --model facebook/<model> --duration <secs> --sample-rate <hz> <prompt>
//! ```
//!
//! The generator command is split into words at whitespace. Double quotes
//! group a word that contains spaces, such as `"/opt/My Models/gen" --cpu`.
//!
//! The generator writes raw little-endian `f32` mono PCM to stdout and exits
//! with status 0, or prints a message to stderr and exits non-zero.
//!
//! A backend holds generation parameters between calls: the duration is set
//! once per run of jobs sharing a duration and is not safe to change while a
//! generation is in flight, so backends are used through `&mut` only.

use crate::audio::AudioClip;
use crate::error::{Error, Result};
use clap::ValueEnum;
use log::{debug, info};
use std::process::{Command, Stdio};

/// Which kind of sound a backend produces
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Soundtrack / music models
    Music,
    /// Sound effects and ambience models
    Ambient,
}

impl BackendKind {
    /// Output name prefix used when both kinds run for the same activity
    pub fn prefix(&self) -> &'static str {
        match self {
            BackendKind::Music => "music_",
            BackendKind::Ambient => "audio_",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Music => "music",
            BackendKind::Ambient => "audio",
        }
    }
}

/// Which backends a batch runs on
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BackendSelection {
    Music,
    Ambient,
    /// Soundtrack and ambience for every activity
    Dual,
}

impl BackendSelection {
    pub fn kinds(&self) -> &'static [BackendKind] {
        match self {
            BackendSelection::Music => &[BackendKind::Music],
            BackendSelection::Ambient => &[BackendKind::Ambient],
            BackendSelection::Dual => &[BackendKind::Music, BackendKind::Ambient],
        }
    }
}

/// Supported pretrained models
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum Model {
    AudiogenMedium,
    MusicgenSmall,
    MusicgenMedium,
    MusicgenMelody,
    MusicgenLarge,
}

/// Model used for single-backend runs when none is given
pub const DEFAULT_MODEL: Model = Model::AudiogenMedium;
pub const DEFAULT_MUSIC_MODEL: Model = Model::MusicgenMedium;
pub const DEFAULT_AUDIO_MODEL: Model = Model::AudiogenMedium;

impl Model {
    pub fn id(&self) -> &'static str {
        match self {
            Model::AudiogenMedium => "audiogen-medium",
            Model::MusicgenSmall => "musicgen-small",
            Model::MusicgenMedium => "musicgen-medium",
            Model::MusicgenMelody => "musicgen-melody",
            Model::MusicgenLarge => "musicgen-large",
        }
    }

    /// Pretrained checkpoint name
    pub fn repository(&self) -> String {
        format!("facebook/{}", self.id())
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Model::AudiogenMedium => BackendKind::Ambient,
            _ => BackendKind::Music,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Something that turns a prompt into a clip.
pub trait GenerationBackend {
    fn kind(&self) -> BackendKind;

    /// Human readable name for messages
    fn name(&self) -> String;

    /// Sample rate of the clips this backend returns
    fn sample_rate(&self) -> u32;

    /// Set the clip length for subsequent `generate` calls.
    fn set_duration(&mut self, seconds: u32);

    /// Generate one clip for `prompt` at the configured duration.
    fn generate(&mut self, prompt: &str) -> Result<AudioClip>;
}

/// Backend that shells out to an external generator program
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    base_args: Vec<String>,
    model: Model,
    sample_rate: u32,
    duration: Option<u32>,
}

impl CommandBackend {
    /// The first word of `command_line` is the program, the rest are passed
    /// before the generation arguments.
    pub fn new(command_line: &str, model: Model, sample_rate: u32) -> Result<Self> {
        let mut words = split_command_line(command_line)?.into_iter();
        let program = words
            .next()
            .ok_or_else(|| Error::validation("Generator command is empty"))?;
        Ok(Self {
            program,
            base_args: words.collect(),
            model,
            sample_rate,
            duration: None,
        })
    }

    fn arguments(&self, prompt: &str, duration: u32) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend([
            "--model".to_string(),
            self.model.repository(),
            "--duration".to_string(),
            duration.to_string(),
            "--sample-rate".to_string(),
            self.sample_rate.to_string(),
            prompt.to_string(),
        ]);
        args
    }
}

/// Split at whitespace outside double quotes.
fn split_command_line(command_line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in command_line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err(Error::validation(format!(
            "Unterminated quote in generator command: {command_line}"
        )));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

impl GenerationBackend for CommandBackend {
    fn kind(&self) -> BackendKind {
        self.model.kind()
    }

    fn name(&self) -> String {
        self.model.id().to_string()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_duration(&mut self, seconds: u32) {
        info!("Configured {} for {seconds}s clips", self.model);
        self.duration = Some(seconds);
    }

    fn generate(&mut self, prompt: &str) -> Result<AudioClip> {
        let duration = self.duration.filter(|d| *d > 0).ok_or_else(|| {
            Error::generation(format!("{} has no generation duration configured", self.model))
        })?;

        let args = self.arguments(prompt, duration);
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::generation(format!(
                    "Failed to execute generator '{}': {e}. Is it installed and on PATH?",
                    self.program
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            return Err(Error::generation(if message.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                message.to_string()
            }));
        }

        AudioClip::from_f32_le(&output.stdout, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ids_match_cli_values() {
        for model in Model::value_variants() {
            let value = model.to_possible_value().expect("every model is selectable");
            assert_eq!(value.get_name(), model.id());
        }
    }

    #[test]
    fn test_model_kinds() {
        assert_eq!(Model::AudiogenMedium.kind(), BackendKind::Ambient);
        assert_eq!(Model::MusicgenMelody.kind(), BackendKind::Music);
        assert_eq!(DEFAULT_MUSIC_MODEL.kind(), BackendKind::Music);
        assert_eq!(DEFAULT_AUDIO_MODEL.kind(), BackendKind::Ambient);
        assert_eq!(Model::MusicgenSmall.repository(), "facebook/musicgen-small");
    }

    #[test]
    fn test_selection_kinds() {
        assert_eq!(BackendSelection::Dual.kinds().len(), 2);
        assert_eq!(BackendSelection::Ambient.kinds(), &[BackendKind::Ambient]);
    }

    #[test]
    fn test_command_line_split() {
        let backend =
            CommandBackend::new("python3 generate.py", Model::MusicgenSmall, 32_000).unwrap();
        assert_eq!(backend.program, "python3");
        let args = backend.arguments("A happy song", 3);
        assert_eq!(
            args,
            vec![
                "generate.py",
                "--model",
                "facebook/musicgen-small",
                "--duration",
                "3",
                "--sample-rate",
                "32000",
                "A happy song"
            ]
        );
        assert!(CommandBackend::new("   ", Model::MusicgenSmall, 32_000).is_err());
    }

    #[test]
    fn test_quoted_program_path_keeps_spaces() {
        let command = r#""/Users/Jane Doe/bin/gen"  --device cuda:0"#;
        let backend = CommandBackend::new(command, Model::AudiogenMedium, 16_000).unwrap();
        assert_eq!(backend.program, "/Users/Jane Doe/bin/gen");
        assert_eq!(backend.base_args, vec!["--device", "cuda:0"]);

        let unterminated = CommandBackend::new(r#""/opt/gen --cpu"#, Model::AudiogenMedium, 16_000);
        assert!(matches!(unterminated, Err(Error::Validation(_))));
    }

    #[test]
    fn test_generate_requires_duration() {
        let mut backend = CommandBackend::new("true", Model::AudiogenMedium, 16_000).unwrap();
        let err = backend.generate("dog barking").unwrap_err();
        assert!(err.to_string().contains("no generation duration"));
    }

    #[test]
    fn test_missing_program() {
        let model = Model::AudiogenMedium;
        let mut backend = CommandBackend::new("dayscore-no-such-generator", model, 16_000).unwrap();
        backend.set_duration(1);
        assert!(matches!(backend.generate("rain"), Err(Error::Generation(_))));
    }

    #[cfg(unix)]
    mod process {
        use crate::backend::{CommandBackend, GenerationBackend, Model};
        use std::fs;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("generator.sh");
            fs::write(&path, body).unwrap();
            format!("sh {}", path.display())
        }

        #[test]
        fn test_reads_pcm_from_stdout() {
            let dir = TempDir::new().unwrap();
            // Two samples: 0.5 (0x3f000000) and 0.0
            let command = script(&dir, "printf '\\000\\000\\000\\077\\000\\000\\000\\000'\n");
            let mut backend = CommandBackend::new(&command, Model::MusicgenSmall, 32_000).unwrap();
            backend.set_duration(2);

            let clip = backend.generate("A happy song").unwrap();
            assert_eq!(clip.samples, vec![0.5, 0.0]);
            assert_eq!(clip.sample_rate, 32_000);
        }

        #[test]
        fn test_failure_carries_stderr() {
            let dir = TempDir::new().unwrap();
            let command = script(&dir, "echo 'CUDA out of memory' >&2\nexit 3\n");
            let mut backend = CommandBackend::new(&command, Model::AudiogenMedium, 16_000).unwrap();
            backend.set_duration(5);

            let err = backend.generate("dog barking").unwrap_err();
            assert!(err.to_string().contains("CUDA out of memory"));
        }
    }
}
