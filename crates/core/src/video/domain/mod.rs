pub mod encode_error;
pub mod encoder_catalog;
pub mod frame_preview;
pub mod frame_sink;
pub mod video_writer;
