use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::loudness::DEFAULT_THRESHOLD_DB;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Samples per analysis frame, a power of two.
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// Input device name for live capture.
    #[serde(default = "default_device")]
    pub device: String,
}

/// Loudness gate and ripeness band limits.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_loudness_threshold_db")]
    pub loudness_threshold_db: f64,
    /// Lower edge of the ripe band, inclusive.
    #[serde(default = "default_ripe_min_hz")]
    pub ripe_min_hz: f64,
    /// Upper edge of the ripe band, inclusive.
    #[serde(default = "default_ripe_max_hz")]
    pub ripe_max_hz: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_size: default_frame_size(),
            device: default_device(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            loudness_threshold_db: default_loudness_threshold_db(),
            ripe_min_hz: default_ripe_min_hz(),
            ripe_max_hz: default_ripe_max_hz(),
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            bail!("sample_rate must be greater than zero");
        }
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            bail!("frame_size must be a power of two >= 2, got {}", self.frame_size);
        }
        Ok(())
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.loudness_threshold_db.is_finite() {
            bail!("loudness_threshold_db must be finite");
        }
        if !self.ripe_min_hz.is_finite() || !self.ripe_max_hz.is_finite() {
            bail!("ripe band limits must be finite");
        }
        if self.ripe_min_hz > self.ripe_max_hz {
            bail!(
                "ripe_min_hz ({}) must not exceed ripe_max_hz ({})",
                self.ripe_min_hz,
                self.ripe_max_hz
            );
        }
        Ok(())
    }
}

fn default_sample_rate() -> u32 { 44_100 }
fn default_frame_size() -> usize { 4096 }
fn default_device() -> String { "default".into() }
fn default_loudness_threshold_db() -> f64 { DEFAULT_THRESHOLD_DB }
fn default_ripe_min_hz() -> f64 { 133.0 }
fn default_ripe_max_hz() -> f64 { 160.0 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::debug!("Config parse error: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert_eq!(cfg.audio.frame_size, 4096);
        assert_eq!(cfg.audio.device, "default");
        assert_eq!(cfg.classifier, ClassifierConfig::default());
        assert_eq!(cfg.classifier.loudness_threshold_db, 50.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_config(
            r#"
            [audio]
            frame_size = 2048

            [classifier]
            ripe_max_hz = 170.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.audio.frame_size, 2048);
        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert_eq!(cfg.classifier.ripe_min_hz, 133.0);
        assert_eq!(cfg.classifier.ripe_max_hz, 170.0);
    }

    #[test]
    fn malformed_file_is_none() {
        assert!(parse_config("[audio\nframe_size = ").is_none());
        assert!(parse_config("[audio]\nframe_size = \"big\"").is_none());
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_config(Path::new("/nonexistent/ripecheck.toml")).is_none());
    }

    #[test]
    fn audio_validation() {
        assert!(AudioConfig::default().validate().is_ok());

        let odd = AudioConfig { frame_size: 3000, ..AudioConfig::default() };
        assert!(odd.validate().is_err());

        let tiny = AudioConfig { frame_size: 1, ..AudioConfig::default() };
        assert!(tiny.validate().is_err());

        let no_rate = AudioConfig { sample_rate: 0, ..AudioConfig::default() };
        assert!(no_rate.validate().is_err());
    }

    #[test]
    fn classifier_validation() {
        assert!(ClassifierConfig::default().validate().is_ok());

        let inverted = ClassifierConfig {
            ripe_min_hz: 170.0,
            ..ClassifierConfig::default()
        };
        assert!(inverted.validate().is_err());

        let nan = ClassifierConfig {
            loudness_threshold_db: f64::NAN,
            ..ClassifierConfig::default()
        };
        assert!(nan.validate().is_err());

        let point_band = ClassifierConfig {
            ripe_min_hz: 150.0,
            ripe_max_hz: 150.0,
            ..ClassifierConfig::default()
        };
        assert!(point_band.validate().is_ok());
    }
}
