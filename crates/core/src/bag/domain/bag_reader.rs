use std::path::Path;

use crate::bag::domain::bag_error::BagError;
use crate::bag::domain::image_message::ImageMessage;
use crate::bag::infrastructure::cdr;
use crate::shared::constants::IMAGE_MSGTYPE;

/// A named message stream recorded in a bag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub topic: String,
    pub msgtype: String,
}

impl Connection {
    pub fn new(topic: impl Into<String>, msgtype: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            msgtype: msgtype.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.msgtype == IMAGE_MSGTYPE
    }
}

/// One serialized message as stored in the bag.
#[derive(Clone, Debug)]
pub struct BagMessage {
    pub connection: Connection,
    /// Receive time in nanoseconds since the epoch.
    pub timestamp: i64,
    pub data: Vec<u8>,
}

pub type MessageIter<'a> = Box<dyn Iterator<Item = Result<BagMessage, BagError>> + 'a>;

/// Read access to one recorded bag.
///
/// Storage layout stays behind this trait; the pipeline only sees
/// connections and timestamp-ordered messages.
pub trait BagReader {
    /// Bag directory.
    fn path(&self) -> &Path;

    fn connections(&self) -> &[Connection];

    /// Messages of `connection`, lazily, in timestamp order.
    fn messages<'a>(&'a self, connection: &Connection) -> Result<MessageIter<'a>, BagError>;

    /// Deserializes a message of an image connection.
    fn deserialize_image(&self, message: &BagMessage) -> Result<ImageMessage, BagError> {
        if !message.connection.is_image() {
            return Err(BagError::NotAnImage(message.connection.msgtype.clone()));
        }
        Ok(cdr::decode_image(&message.data)?)
    }
}
