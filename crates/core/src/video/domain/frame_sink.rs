use crate::shared::frame::Frame;
use crate::video::domain::encode_error::EncodeError;

/// Final consumer of encoded-session frames.
///
/// A sink is driven by exactly one thread at a time, so implementations
/// need no interior locking.
pub trait FrameSink: Send {
    /// Pushes one frame. All frames of a session share the first frame's
    /// shape and format.
    fn feed(&mut self, frame: &Frame) -> Result<(), EncodeError>;

    /// Flushes and closes the sink. Must be a no-op when nothing was fed,
    /// and safe to call more than once.
    fn finish(&mut self) -> Result<(), EncodeError>;
}
