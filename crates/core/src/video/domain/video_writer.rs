use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::encode_error::EncodeError;

/// Lifecycle of one output file. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    /// Constructed; no thread or encoder process yet.
    Idle,
    /// Accepting frames.
    Streaming,
    /// Stop requested; queued frames are being flushed.
    Draining,
    Closed,
}

/// Abstracts the encoding session so the driver can stream frames without
/// depending on how (or whether) they reach an encoder process.
pub trait VideoWriter: Send {
    /// Queues a frame. The frame is copied before this returns, so the
    /// caller may reuse its buffer immediately.
    fn write(&mut self, frame: &Frame) -> Result<(), EncodeError>;

    /// Drains everything queued, closes the encoder and waits for it.
    /// Calling it again after the session closed is a no-op.
    fn release(&mut self) -> Result<(), EncodeError>;

    fn state(&self) -> WriterState;

    /// Frames accepted by `write` so far.
    fn frames_written(&self) -> u64;
}

/// Opens one writer per output file.
pub trait VideoWriterFactory {
    fn create(&self, output_path: &Path, fps: f64) -> Result<Box<dyn VideoWriter>, EncodeError>;
}
