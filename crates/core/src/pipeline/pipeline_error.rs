use thiserror::Error;

use crate::bag::domain::bag_error::BagError;
use crate::bag::domain::image_message::ImageError;
use crate::pipeline::convert_config::ConfigError;
use crate::video::domain::encode_error::EncodeError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Bag(#[from] BagError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ImageError> for PipelineError {
    fn from(e: ImageError) -> Self {
        Self::Bag(BagError::Image(e))
    }
}
