use thiserror::Error;

use crate::shared::frame::{Frame, PixelFormat};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("unsupported pixel encoding '{0}'")]
    UnsupportedPixelFormat(String),
    #[error("row step {step} is smaller than {row_bytes} bytes per row")]
    InvalidStep { step: usize, row_bytes: usize },
    #[error("image data holds {actual} bytes, expected at least {expected}")]
    Truncated { expected: usize, actual: usize },
}

/// Decoded `sensor_msgs/msg/Image`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageMessage {
    pub stamp_sec: i32,
    pub stamp_nanosec: u32,
    pub frame_id: String,
    pub height: u32,
    pub width: u32,
    pub encoding: String,
    pub is_bigendian: bool,
    /// Bytes per row, including any padding.
    pub step: u32,
    pub data: Vec<u8>,
}

impl ImageMessage {
    /// Pixel layout this message streams as, if its encoding is supported.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        PixelFormat::from_ros_encoding(&self.encoding)
    }

    /// Converts into a tightly packed frame, dropping row padding.
    pub fn into_frame(self) -> Result<Frame, ImageError> {
        let format = self
            .pixel_format()
            .ok_or_else(|| ImageError::UnsupportedPixelFormat(self.encoding.clone()))?;

        let height = self.height as usize;
        let step = self.step as usize;
        let row_bytes = self.width as usize * format.channels() as usize;
        if step < row_bytes {
            return Err(ImageError::InvalidStep { step, row_bytes });
        }
        if self.data.len() < step * height {
            return Err(ImageError::Truncated {
                expected: step * height,
                actual: self.data.len(),
            });
        }

        let mut data = self.data;
        if step == row_bytes {
            data.truncate(row_bytes * height);
        } else {
            data = data
                .chunks_exact(step)
                .take(height)
                .flat_map(|row| &row[..row_bytes])
                .copied()
                .collect();
        }

        Ok(Frame::new(data, self.width, self.height, format))
    }
}
