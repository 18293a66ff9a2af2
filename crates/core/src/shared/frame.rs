use std::fmt;

use ndarray::{ArrayView3, ShapeError};

/// Interleaved 8-bit pixel layouts a frame can carry.
///
/// The layout is declared to the encoder as-is; no conversion happens
/// between the image message and the encoder's stdin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Gray8,
}

impl PixelFormat {
    pub const ALL: &[PixelFormat] = &[PixelFormat::Rgb24, PixelFormat::Bgr24, PixelFormat::Gray8];

    /// Name passed to ffmpeg's `-pix_fmt` for the raw input.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Bgr24 => "bgr24",
            PixelFormat::Gray8 => "gray",
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Maps a `sensor_msgs/Image` encoding string, if it is one we stream.
    pub fn from_ros_encoding(encoding: &str) -> Option<Self> {
        match encoding {
            "rgb8" => Some(PixelFormat::Rgb24),
            "bgr8" => Some(PixelFormat::Bgr24),
            "mono8" => Some(PixelFormat::Gray8),
            _ => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ffmpeg_name())
    }
}

/// A single image frame: contiguous row-major bytes plus their pixel layout.
///
/// Width and height travel with the buffer so the encoder can size itself
/// from the first frame it sees.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (format.channels() as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            format,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> u8 {
        self.format.channels()
    }

    /// Number of bytes one frame of this shape occupies on the encoder pipe.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Borrowed `(height, width, channels)` view of the pixel data.
    pub fn as_ndarray(&self) -> Result<ArrayView3<'_, u8>, ShapeError> {
        ArrayView3::from_shape(self.shape(), &self.data)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels() as usize,
        )
    }
}
