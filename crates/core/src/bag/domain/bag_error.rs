use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::bag::domain::image_message::ImageError;
use crate::bag::infrastructure::cdr::CdrError;

#[derive(Error, Debug)]
pub enum BagError {
    #[error("'{0}' is not a valid rosbag")]
    InvalidBagPath(PathBuf),
    #[error("no sqlite3 storage files (*.db3) in {0}")]
    NoStorage(PathBuf),
    #[error("failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read bag storage {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("cannot deserialize '{0}' as an image")]
    NotAnImage(String),
    #[error("failed to decode image message: {0}")]
    Decode(#[from] CdrError),
    #[error(transparent)]
    Image(#[from] ImageError),
}
