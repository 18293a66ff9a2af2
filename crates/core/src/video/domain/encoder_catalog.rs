/// Source of the video encoder names an encoder installation supports.
pub trait EncoderCatalog {
    fn video_encoders(&self) -> Vec<String>;
}
