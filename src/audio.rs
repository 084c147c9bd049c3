//! Decoded audio clips and WAV output.
//!
//! Clips are mono `f32` samples in `[-1.0, 1.0]`. They are written as 16-bit
//! PCM WAV after peak normalization, so quiet and loud generations end up at
//! a comparable level.

use crate::error::{Error, Result};
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Target peak after normalization, -1 dBFS
const TARGET_PEAK: f32 = 0.891;

/// One generated clip
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode raw little-endian `f32` PCM.
    pub fn from_f32_le(bytes: &[u8], sample_rate: u32) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::generation(format!(
                "PCM stream length {} is not a multiple of 4 bytes",
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self::new(samples, sample_rate))
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Scale so the loudest sample sits at the target peak. Silence and
    /// non-finite samples are left alone.
    pub fn normalized(&self) -> Vec<f32> {
        let peak = self
            .samples
            .iter()
            .filter(|s| s.is_finite())
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        if peak <= f32::EPSILON {
            return self.samples.clone();
        }
        let gain = TARGET_PEAK / peak;
        self.samples
            .iter()
            .map(|s| if s.is_finite() { s * gain } else { 0.0 })
            .collect()
    }
}

/// Write a clip as 16-bit mono PCM WAV, creating the parent directory.
///
/// The clip is written next to `path` with a `.part` suffix and renamed into
/// place, so a failed write never leaves a truncated `.wav` behind.
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<()> {
    if clip.samples.is_empty() {
        return Err(Error::generation("Backend returned an empty clip"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            Error::generation(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }

    let part = part_path(path);
    let written = File::create(&part)
        .and_then(|file| encode(&mut BufWriter::new(file), clip))
        .and_then(|()| fs::rename(&part, path));
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&part) {
            debug!("Could not remove {}: {cleanup}", part.display());
        }
        return Err(Error::generation(format!("Failed to write {}: {e}", path.display())));
    }

    debug!(
        "Wrote {:.1}s clip at {} Hz to {}",
        clip.duration_secs(),
        clip.sample_rate,
        path.display()
    );
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

fn encode<W: Write>(out: &mut W, clip: &AudioClip) -> io::Result<()> {
    let samples = clip.normalized();
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = clip.sample_rate * 2;

    out.write_all(b"RIFF")?;
    out.write_all(&(36 + data_len).to_le_bytes())?;
    out.write_all(b"WAVEfmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?; // PCM
    out.write_all(&1u16.to_le_bytes())?; // mono
    out.write_all(&clip.sample_rate.to_le_bytes())?;
    out.write_all(&byte_rate.to_le_bytes())?;
    out.write_all(&2u16.to_le_bytes())?; // block align
    out.write_all(&16u16.to_le_bytes())?;
    out.write_all(b"data")?;
    out.write_all(&data_len.to_le_bytes())?;
    for s in samples {
        let pcm = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        out.write_all(&pcm.to_le_bytes())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_f32_le() {
        let bytes: Vec<u8> = [0.5f32, -0.25].iter().flat_map(|s| s.to_le_bytes()).collect();
        let clip = AudioClip::from_f32_le(&bytes, 16_000).unwrap();
        assert_eq!(clip.samples, vec![0.5, -0.25]);
        assert!(AudioClip::from_f32_le(&bytes[..5], 16_000).is_err());
    }

    #[test]
    fn test_normalization_targets_peak() {
        let clip = AudioClip::new(vec![0.1, -0.2, 0.05], 16_000);
        let normalized = clip.normalized();
        let peak = normalized.iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!((peak - TARGET_PEAK).abs() < 1e-6);

        let silence = AudioClip::new(vec![0.0; 4], 16_000);
        assert_eq!(silence.normalized(), vec![0.0; 4]);
    }

    #[test]
    fn test_write_wav_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/clip.wav");
        let clip = AudioClip::new(vec![0.0, 0.5, -0.5, 0.25], 32_000);

        write_wav(&path, &clip).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 44 + 4 * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        let rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        assert_eq!(rate, 32_000);
        assert_eq!(&bytes[36..40], b"data");
        assert!(!dir.path().join("nested/clip.wav.part").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        // A directory in the way makes the final rename fail
        let path = dir.path().join("taken.wav");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let err = write_wav(&path, &AudioClip::new(vec![0.1; 64], 16_000)).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(!dir.path().join("taken.wav.part").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_write_empty_clip_fails() {
        let dir = TempDir::new().unwrap();
        let empty = AudioClip::new(vec![], 16_000);
        let err = write_wav(&dir.path().join("x.wav"), &empty).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_duration() {
        assert_eq!(AudioClip::new(vec![0.0; 48_000], 16_000).duration_secs(), 3.0);
    }
}
