//! Minimal CDR (XCDR1) decoding for the message types the pipeline reads.
//!
//! Serialized ROS 2 messages start with a 4-byte encapsulation header
//! (representation id + options); primitive alignment is relative to the
//! first byte after that header.

use thiserror::Error;

use crate::bag::domain::image_message::ImageMessage;

const CDR_BE: u16 = 0x0000;
const CDR_LE: u16 = 0x0001;
const HEADER_LEN: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CdrError {
    #[error("message is shorter than its encapsulation header")]
    MissingHeader,
    #[error("unsupported CDR representation {0:#06x}")]
    UnsupportedEncapsulation(u16),
    #[error("unexpected end of message at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

struct CdrReader<'a> {
    body: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> CdrReader<'a> {
    fn new(message: &'a [u8]) -> Result<Self, CdrError> {
        if message.len() < HEADER_LEN {
            return Err(CdrError::MissingHeader);
        }
        let little_endian = match u16::from_be_bytes([message[0], message[1]]) {
            CDR_LE => true,
            CDR_BE => false,
            other => return Err(CdrError::UnsupportedEncapsulation(other)),
        };
        Ok(Self {
            body: &message[HEADER_LEN..],
            pos: 0,
            little_endian,
        })
    }

    fn align(&mut self, n: usize) {
        self.pos = self.pos.div_ceil(n) * n;
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CdrError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.body.len());
        let Some(end) = end else {
            return Err(CdrError::UnexpectedEof {
                offset: self.pos + HEADER_LEN,
                needed: n,
            });
        };
        let bytes = &self.body[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, CdrError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, CdrError> {
        self.align(4);
        let b = self.take(4)?;
        let raw = [b[0], b[1], b[2], b[3]];
        Ok(if self.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn read_i32(&mut self) -> Result<i32, CdrError> {
        Ok(self.read_u32()? as i32)
    }

    /// Length-prefixed string; the length counts the trailing NUL.
    fn read_string(&mut self) -> Result<String, CdrError> {
        let len = self.read_u32()? as usize;
        let start = self.pos + HEADER_LEN;
        let bytes = self.take(len)?;
        let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        String::from_utf8(text.to_vec()).map_err(|_| CdrError::InvalidUtf8(start))
    }

    fn read_byte_sequence(&mut self) -> Result<Vec<u8>, CdrError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}

/// Decodes a serialized `sensor_msgs/msg/Image`.
pub fn decode_image(message: &[u8]) -> Result<ImageMessage, CdrError> {
    let mut r = CdrReader::new(message)?;
    let stamp_sec = r.read_i32()?;
    let stamp_nanosec = r.read_u32()?;
    let frame_id = r.read_string()?;
    let height = r.read_u32()?;
    let width = r.read_u32()?;
    let encoding = r.read_string()?;
    let is_bigendian = r.read_u8()? != 0;
    let step = r.read_u32()?;
    let data = r.read_byte_sequence()?;

    Ok(ImageMessage {
        stamp_sec,
        stamp_nanosec,
        frame_id,
        height,
        width,
        encoding,
        is_bigendian,
        step,
        data,
    })
}
