use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::shared::constants::FFMPEG_BINARY;
use crate::video::domain::encode_error::EncodeError;
use crate::video::domain::encoder_catalog::EncoderCatalog;

/// Lists encoders by running `<binary> -hide_banner -encoders`.
///
/// A binary that cannot be started yields an empty list, so callers report
/// `NoSupportedCodec` rather than a launch error.
pub struct FfmpegEncoderCatalog {
    binary: String,
}

impl FfmpegEncoderCatalog {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for FfmpegEncoderCatalog {
    fn default() -> Self {
        Self::new(FFMPEG_BINARY)
    }
}

impl EncoderCatalog for FfmpegEncoderCatalog {
    fn video_encoders(&self) -> Vec<String> {
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) => parse_video_encoders(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                log::warn!("{} is not installed or could not be started: {e}", self.binary);
                Vec::new()
            }
        }
    }
}

/// Memoizes encoder listings for the lifetime of the process, per binary.
pub struct CachedEncoderCatalog {
    inner: FfmpegEncoderCatalog,
}

impl CachedEncoderCatalog {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            inner: FfmpegEncoderCatalog::new(binary),
        }
    }
}

impl EncoderCatalog for CachedEncoderCatalog {
    fn video_encoders(&self) -> Vec<String> {
        static LISTINGS: OnceLock<Mutex<HashMap<String, Vec<String>>>> = OnceLock::new();

        let mut listings = LISTINGS
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listings
            .entry(self.inner.binary().to_string())
            .or_insert_with(|| self.inner.video_encoders())
            .clone()
    }
}

/// Extracts video encoder names from an `ffmpeg -encoders` report.
///
/// Entries look like ` V....D h264_nvenc   NVIDIA NVENC H.264 encoder`;
/// the legend above the `------` separator never parses as an entry.
pub fn parse_video_encoders(report: &str) -> Vec<String> {
    report
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            (is_video_flags(flags) && is_encoder_name(name)).then(|| name.to_string())
        })
        .collect()
}

fn is_video_flags(flags: &str) -> bool {
    flags.len() == 6
        && flags.starts_with('V')
        && flags[1..].chars().all(|c| ".FSXBD".contains(c))
}

fn is_encoder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Picks the first codec in `preference` that `catalog` reports.
pub fn resolve_codec<S: AsRef<str>>(
    catalog: &dyn EncoderCatalog,
    preference: &[S],
) -> Result<String, EncodeError> {
    let available = catalog.video_encoders();
    log::debug!("{} video encoders available", available.len());

    preference
        .iter()
        .map(AsRef::as_ref)
        .find(|codec| available.iter().any(|a| a == codec))
        .map(str::to_string)
        .ok_or_else(|| EncodeError::NoSupportedCodec {
            tried: preference.iter().map(|c| c.as_ref().to_string()).collect(),
        })
}

/// Like `resolve_codec`, against the memoized listing of `binary`.
pub fn resolve_cached<S: AsRef<str>>(binary: &str, preference: &[S]) -> Result<String, EncodeError> {
    resolve_codec(&CachedEncoderCatalog::new(binary), preference)
}
