use crate::shared::frame::Frame;

pub type PreviewError = Box<dyn std::error::Error + Send + Sync>;

/// Mirrors written frames somewhere a human can look at them.
///
/// Preview runs on the producer's thread and is independent of encoding:
/// a failing preview never fails the session.
pub trait FramePreview: Send {
    fn show(&mut self, frame: &Frame) -> Result<(), PreviewError>;

    fn close(&mut self) {}
}
