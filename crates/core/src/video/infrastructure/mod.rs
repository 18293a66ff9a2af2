pub mod codec_resolver;
pub mod ffmpeg_process;
pub mod frame_channel;
pub mod snapshot_preview;
pub mod streaming_video_writer;
pub mod writer_factory;
