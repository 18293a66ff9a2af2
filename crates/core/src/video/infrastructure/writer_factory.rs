use std::path::{Path, PathBuf};

use crate::video::domain::encode_error::EncodeError;
use crate::video::domain::encoder_catalog::EncoderCatalog;
use crate::video::domain::video_writer::{VideoWriter, VideoWriterFactory};
use crate::video::infrastructure::codec_resolver::CachedEncoderCatalog;
use crate::video::infrastructure::snapshot_preview::SnapshotPreview;
use crate::video::infrastructure::streaming_video_writer::{StreamingVideoWriter, WriterOptions};

/// Opens `StreamingVideoWriter`s backed by ffmpeg.
pub struct FfmpegWriterFactory {
    catalog: Box<dyn EncoderCatalog>,
    codec_preference: Vec<String>,
    options: WriterOptions,
    preview: Option<(PathBuf, u64)>,
}

impl FfmpegWriterFactory {
    /// Codecs are looked up once per process through the memoized catalog
    /// of `options.ffmpeg_binary`.
    pub fn new(codec_preference: Vec<String>, options: WriterOptions) -> Self {
        Self {
            catalog: Box::new(CachedEncoderCatalog::new(options.ffmpeg_binary.clone())),
            codec_preference,
            options,
            preview: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Box<dyn EncoderCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Mirrors each session to `<dir>/<file stem>.png` every `every` frames.
    pub fn with_preview(mut self, dir: impl Into<PathBuf>, every: u64) -> Self {
        self.preview = Some((dir.into(), every));
        self
    }
}

impl VideoWriterFactory for FfmpegWriterFactory {
    fn create(&self, output_path: &Path, fps: f64) -> Result<Box<dyn VideoWriter>, EncodeError> {
        let mut writer = StreamingVideoWriter::open(
            output_path,
            fps,
            self.catalog.as_ref(),
            self.codec_preference.as_slice(),
            self.options.clone(),
        )?;
        if let Some((dir, every)) = &self.preview {
            let name = output_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "preview".to_string());
            writer = writer.with_preview(Box::new(SnapshotPreview::new(dir, &name, *every)));
        }
        Ok(Box::new(writer))
    }
}
