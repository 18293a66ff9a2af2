use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::s;

use crate::shared::frame::{Frame, PixelFormat};
use crate::video::domain::frame_preview::{FramePreview, PreviewError};

/// Periodically saves the frame being written as a PNG snapshot.
///
/// The first frame is always saved, then every `every`-th frame after it,
/// overwriting the same file so it shows the latest picture of the stream.
pub struct SnapshotPreview {
    path: PathBuf,
    every: u64,
    seen: u64,
}

impl SnapshotPreview {
    /// Snapshot at `<dir>/<name>.png`.
    pub fn new(dir: &Path, name: &str, every: u64) -> Self {
        Self {
            path: dir.join(format!("{name}.png")),
            every: every.max(1),
            seen: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FramePreview for SnapshotPreview {
    fn show(&mut self, frame: &Frame) -> Result<(), PreviewError> {
        let due = self.seen % self.every == 0;
        self.seen += 1;
        if !due {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        to_image(frame)?.save(&self.path)?;
        Ok(())
    }

    fn close(&mut self) {
        log::debug!("Preview of {} closed after {} frames", self.path.display(), self.seen);
    }
}

fn to_image(frame: &Frame) -> Result<DynamicImage, PreviewError> {
    let (width, height) = (frame.width(), frame.height());
    let image = match frame.format() {
        PixelFormat::Rgb24 => {
            RgbImage::from_raw(width, height, frame.data().to_vec()).map(DynamicImage::ImageRgb8)
        }
        PixelFormat::Bgr24 => {
            let rgb: Vec<u8> = frame
                .as_ndarray()?
                .slice(s![.., .., ..;-1])
                .iter()
                .copied()
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        PixelFormat::Gray8 => {
            GrayImage::from_raw(width, height, frame.data().to_vec()).map(DynamicImage::ImageLuma8)
        }
    };
    image.ok_or_else(|| "frame data does not match its dimensions".into())
}
