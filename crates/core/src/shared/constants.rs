use std::time::Duration;

/// Encoders tried in order when resolving the output codec.
pub const CODEC_PREFERENCE: &[&str] = &["h264_nvenc", "libx264"];

pub const FFMPEG_BINARY: &str = "ffmpeg";

/// Pixel format of the encoded output (4:2:0 chroma subsampling).
pub const OUTPUT_PIXEL_FORMAT: &str = "yuv420p";

pub const ENCODER_LOG_LEVEL: &str = "quiet";

pub const DEFAULT_FPS: f64 = 30.0;

/// Frames buffered between a producer and its encoder thread.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// How long the encoder thread waits on an empty queue before re-checking
/// the stop flag.
pub const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

pub const BAG_METADATA_FILENAME: &str = "metadata.yaml";

pub const SQLITE_STORAGE_EXTENSION: &str = "db3";

pub const IMAGE_MSGTYPE: &str = "sensor_msgs/msg/Image";

pub const VIDEO_EXTENSION: &str = "mp4";

/// Frames between progress reports of one topic.
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

/// Frames between preview snapshots.
pub const DEFAULT_PREVIEW_EVERY: u64 = 30;
