use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    CODEC_PREFERENCE, DEFAULT_CHANNEL_CAPACITY, DEFAULT_FPS, DEFAULT_PROGRESS_EVERY, FFMPEG_BINARY,
};
use crate::video::infrastructure::streaming_video_writer::WriterOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("fps must be a positive number, got {0}")]
    InvalidFps(f64),
    #[error("channel_capacity must be at least 1")]
    ZeroCapacity,
    #[error("codec_preference must name at least one codec")]
    EmptyCodecPreference,
}

/// Settings for one conversion run. Missing JSON keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub fps: f64,
    /// Root for outputs; each bag writes to `<out_dir>/<bag name>`. Unset
    /// means next to the bag.
    pub out_dir: Option<PathBuf>,
    pub skip_exist: bool,
    pub codec_preference: Vec<String>,
    pub channel_capacity: usize,
    /// Encode on a background thread per video.
    pub threaded: bool,
    pub ffmpeg_binary: String,
    /// Where snapshot previews go. Unset disables previews.
    pub preview_dir: Option<PathBuf>,
    pub progress_every: u64,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            out_dir: None,
            skip_exist: false,
            codec_preference: CODEC_PREFERENCE.iter().map(|c| c.to_string()).collect(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            threaded: true,
            ffmpeg_binary: FFMPEG_BINARY.to_string(),
            preview_dir: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl ConvertConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.codec_preference.is_empty() {
            return Err(ConfigError::EmptyCodecPreference);
        }
        Ok(())
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            threaded: self.threaded,
            channel_capacity: self.channel_capacity,
            ffmpeg_binary: self.ffmpeg_binary.clone(),
            ..WriterOptions::default()
        }
    }
}
