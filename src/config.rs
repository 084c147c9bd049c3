//! # Configuration Module
//!
//! This module handles runtime configuration for dayscore. Settings are read
//! in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.json` in the platform configuration directory
//! 3. Environment variables (`DAYSCORE_OUTPUT_DIR`, `DAYSCORE_GENERATOR`)
//!
//! Command-line flags are applied on top by the binary.
//!
//! ## Configuration File
//!
//! - Linux: `~/.config/dayscore/config.json`
//! - macOS: `~/Library/Application Support/dayscore/config.json`
//! - Windows: `%APPDATA%\dayscore\config.json`
//!
//! Every field is optional:
//!
//! ```json
//! {
//!   "output_dir": "outputs",
//!   "seconds_per_clip_second": 360,
//!   "generator": "audiocraft-generate",
//!   "llm": { "model": "gpt-3.5-turbo-1106" }
//! }
//! ```

use crate::backend::BackendKind;
use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const OUTPUT_DIR_ENV: &str = "DAYSCORE_OUTPUT_DIR";
pub const GENERATOR_ENV: &str = "DAYSCORE_GENERATOR";

/// Returns the platform-appropriate configuration directory for dayscore.
///
/// Unlike a data directory this is not created; a missing directory simply
/// means no configuration file.
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system configuration directory. Please ensure your platform supports standard configuration directories."
        )
    })?;
    Ok(config_dir.join("dayscore"))
}

/// Returns the path of the optional configuration file.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}

/// Settings for the creative prompt language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo-1106".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory generated clips are written to
    pub output_dir: PathBuf,
    /// Seconds of calendar time per second of generated audio
    pub seconds_per_clip_second: u32,
    /// External program that synthesizes clips
    pub generator: String,
    /// Sample rate of the music models
    pub music_sample_rate: u32,
    /// Sample rate of the ambient audio models
    pub audio_sample_rate: u32,
    pub llm: LlmConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            // A one hour event becomes a ten second clip.
            seconds_per_clip_second: 360,
            generator: "audiocraft-generate".to_string(),
            music_sample_rate: 32_000,
            audio_sample_rate: 16_000,
            llm: LlmConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from the default file location and environment
    pub fn load() -> Result<Self> {
        let path = get_config_path()?;
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            log::debug!("No configuration file at {}, using defaults", path.display());
            Self::default()
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Read a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in practice.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(program) = lookup(GENERATOR_ENV).filter(|v| !v.is_empty()) {
            self.generator = program;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.seconds_per_clip_second > 0,
            "seconds_per_clip_second must be greater than 0"
        );
        anyhow::ensure!(
            self.music_sample_rate > 0 && self.audio_sample_rate > 0,
            "Sample rates must be greater than 0"
        );
        Ok(())
    }

    /// Sample rate of clips from a backend of `kind`
    pub fn sample_rate(&self, kind: BackendKind) -> u32 {
        match kind {
            BackendKind::Music => self.music_sample_rate,
            BackendKind::Ambient => self.audio_sample_rate,
        }
    }

    /// Output directory as an absolute path, for user-facing messages
    pub fn absolute_output_dir(&self) -> PathBuf {
        self.output_dir
            .absolutize()
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| self.output_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_structure() {
        let path = get_config_path().expect("Should get valid path");
        assert!(path.ends_with("dayscore/config.json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"output_dir": "clips", "llm": {"model": "gpt-4o-mini"}}"#)?;

        let config = RuntimeConfig::from_file(&path)?;
        assert_eq!(config.output_dir, PathBuf::from("clips"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.seconds_per_clip_second, 360);
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json")?;
        assert!(RuntimeConfig::from_file(&path).is_err());

        fs::write(&path, r#"{"seconds_per_clip_second": 0}"#)?;
        assert!(RuntimeConfig::from_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let env: HashMap<&str, &str> = [(OUTPUT_DIR_ENV, "/tmp/clips"), (GENERATOR_ENV, "")]
            .into_iter()
            .collect();
        let config = RuntimeConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()))?;
        assert_eq!(config.output_dir, PathBuf::from("/tmp/clips"));
        // Empty values are ignored.
        assert_eq!(config.generator, "audiocraft-generate");
        Ok(())
    }

    #[test]
    fn test_sample_rate_per_backend() {
        let config = RuntimeConfig::default();
        assert_eq!(config.sample_rate(BackendKind::Music), 32_000);
        assert_eq!(config.sample_rate(BackendKind::Ambient), 16_000);
    }

    #[test]
    fn test_absolute_output_dir() {
        let config = RuntimeConfig::default();
        assert!(config.absolute_output_dir().is_absolute());
        assert!(config.absolute_output_dir().ends_with("outputs"));
    }
}
