pub mod batch_convert_use_case;
pub mod convert_config;
pub mod decode_video_use_case;
pub mod pipeline_error;
pub mod pipeline_logger;
