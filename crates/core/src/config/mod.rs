use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{input::Bindings, scene::SpriteDescriptor, DemoError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioFormat,
    pub frame: FrameConfig,
    pub assets: AssetConfig,
    pub bindings: Bindings,
    pub stage: StageConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(DemoError::InvalidInput("sample rate must be non-zero"));
        }
        if self.audio.channels == 0 {
            return Err(DemoError::InvalidInput("channel count must be non-zero"));
        }
        if self.audio.chunk_frames == 0 {
            return Err(DemoError::InvalidInput("chunk size must be non-zero"));
        }
        if self.frame.target_fps == 0 {
            return Err(DemoError::InvalidInput("target fps must be non-zero"));
        }
        if self.stage.cycle_seconds <= 0.0 {
            return Err(DemoError::InvalidInput("cycle period must be positive"));
        }
        Ok(())
    }
}

/// The single sample format used by the whole process.
///
/// Samples are always signed 16-bit little-endian; only rate, channel count
/// and the device chunk size vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames requested per device callback.
    pub chunk_frames: u32,
}

impl AudioFormat {
    pub const BYTES_PER_SAMPLE: usize = 2;

    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * Self::BYTES_PER_SAMPLE
    }

    /// Byte length of `seconds` worth of audio, rounded down to whole frames.
    pub fn bytes_for_seconds(&self, seconds: f32) -> usize {
        let frames = (seconds.max(0.0) * self.sample_rate as f32) as usize;
        frames * self.bytes_per_frame()
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            chunk_frames: 4096,
        }
    }
}

/// Frame pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub target_fps: u32,
    /// When set the presenter is assumed to block on vertical sync and the
    /// pacer never sleeps.
    pub vsync: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            vsync: false,
        }
    }
}

/// Where the sound effects live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub directory: PathBuf,
    pub intro: String,
    pub shoot: String,
    pub explosion: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("assets"),
            intro: "intro.wav".to_string(),
            shoot: "shoot.wav".to_string(),
            explosion: "explosion.wav".to_string(),
        }
    }
}

/// Stage geometry and the sprites moving on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub width: u32,
    pub height: u32,
    pub cycle_seconds: f32,
    pub sprites: Vec<SpriteDescriptor>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            cycle_seconds: 4.0,
            sprites: SpriteDescriptor::demo_set(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_format() {
        let config = AppConfig::default();
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.chunk_frames, 4096);
        assert_eq!(config.audio.bytes_per_frame(), 2);
        assert_eq!(config.frame.target_fps, 60);
        assert!(!config.stage.sprites.is_empty());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json(r#"{ "audio": { "sample_rate": 22050 } }"#).unwrap();
        assert_eq!(config.audio.sample_rate, 22_050);
        assert_eq!(config.audio.chunk_frames, 4096);
        assert_eq!(config.assets.shoot, "shoot.wav");
    }

    #[test]
    fn rejects_zero_fps() {
        let err = AppConfig::from_json(r#"{ "frame": { "target_fps": 0 } }"#).unwrap_err();
        assert!(matches!(err, DemoError::InvalidInput(_)));
    }

    #[test]
    fn seconds_round_down_to_whole_frames() {
        let format = AudioFormat {
            sample_rate: 10,
            channels: 2,
            chunk_frames: 4,
        };
        assert_eq!(format.bytes_for_seconds(0.55), 5 * 4);
        assert_eq!(format.bytes_for_seconds(-1.0), 0);
    }
}
