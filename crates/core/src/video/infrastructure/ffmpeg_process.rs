use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::shared::constants::{ENCODER_LOG_LEVEL, FFMPEG_BINARY, OUTPUT_PIXEL_FORMAT};
use crate::shared::frame::{Frame, PixelFormat};
use crate::video::domain::encode_error::EncodeError;
use crate::video::domain::frame_sink::FrameSink;

/// Streams raw frames into one ffmpeg process writing one output file.
///
/// The process is spawned on the first `feed`, sized from that frame;
/// later frames are written to its stdin without re-validation, so a
/// session must keep a constant shape and pixel format.
pub struct FfmpegProcess {
    output_path: PathBuf,
    fps: f64,
    codec: String,
    binary: String,
    log_level: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames_fed: u64,
    bytes_fed: u64,
}

impl FfmpegProcess {
    pub fn new(output_path: impl Into<PathBuf>, fps: f64, codec: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            fps,
            codec: codec.into(),
            binary: FFMPEG_BINARY.to_string(),
            log_level: ENCODER_LOG_LEVEL.to_string(),
            child: None,
            stdin: None,
            frames_fed: 0,
            bytes_fed: 0,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn frames_fed(&self) -> u64 {
        self.frames_fed
    }

    pub fn bytes_fed(&self) -> u64 {
        self.bytes_fed
    }

    /// Full argument list for a session of the given frame shape.
    pub fn command_args(&self, width: u32, height: u32, format: PixelFormat) -> Vec<OsString> {
        let size = format!("{width}x{height}");
        let fps = self.fps.to_string();
        let mut args: Vec<OsString> = [
            "-f",
            "rawvideo",
            "-pix_fmt",
            format.ffmpeg_name(),
            "-s",
            size.as_str(),
            "-framerate",
            fps.as_str(),
            "-i",
            "pipe:",
            "-pix_fmt",
            OUTPUT_PIXEL_FORMAT,
            "-c:v",
            self.codec.as_str(),
            "-loglevel",
            self.log_level.as_str(),
            "-y",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(self.output_path.clone().into_os_string());
        args
    }

    fn spawn(&mut self, frame: &Frame) -> Result<(), EncodeError> {
        if let Some(dir) = self.output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| EncodeError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let args = self.command_args(frame.width(), frame.height(), frame.format());
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        self.child = Some(child);
        self.stdin = Some(stdin.ok_or(EncodeError::MissingStdin)?);

        log::info!(
            "Encoding {} ({}x{} {}, {} fps, {})",
            self.output_path.display(),
            frame.width(),
            frame.height(),
            frame.format(),
            self.fps,
            self.codec
        );
        Ok(())
    }
}

impl FrameSink for FfmpegProcess {
    fn feed(&mut self, frame: &Frame) -> Result<(), EncodeError> {
        if self.child.is_none() {
            self.spawn(frame)?;
        }
        let stdin = self.stdin.as_mut().ok_or(EncodeError::MissingStdin)?;
        stdin
            .write_all(frame.data())
            .map_err(|source| EncodeError::Write {
                frame: self.frames_fed,
                source,
            })?;

        self.frames_fed += 1;
        self.bytes_fed += frame.byte_len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        // Closing stdin is the end-of-stream signal.
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(EncodeError::Wait)?;
        if !status.success() {
            return Err(EncodeError::EncoderExit {
                status,
                path: self.output_path.clone(),
            });
        }

        log::debug!(
            "Encoder finished {} after {} frames ({} bytes)",
            self.output_path.display(),
            self.frames_fed,
            self.bytes_fed
        );
        Ok(())
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.finish() {
                log::warn!("Encoder for {} failed on drop: {e}", self.output_path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{solid_frame, stdin_copy_encoder};

    #[test]
    fn test_command_args_describe_raw_input_and_output() {
        let process = FfmpegProcess::new("/tmp/out/cam.mp4", 30.0, "libx264");
        let args: Vec<String> = process
            .command_args(640, 480, PixelFormat::Rgb24)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "-f", "rawvideo", "-pix_fmt", "rgb24", "-s", "640x480", "-framerate", "30",
                "-i", "pipe:", "-pix_fmt", "yuv420p", "-c:v", "libx264", "-loglevel", "quiet",
                "-y", "/tmp/out/cam.mp4",
            ]
        );
    }

    #[test]
    fn test_command_args_pass_fractional_fps_and_gray() {
        let process = FfmpegProcess::new("o.mp4", 12.5, "h264_nvenc").with_log_level("error");
        let args: Vec<String> = process
            .command_args(8, 4, PixelFormat::Gray8)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.windows(2).any(|w| w == ["-framerate", "12.5"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "gray"]));
        assert!(args.windows(2).any(|w| w == ["-s", "8x4"]));
        assert!(args.windows(2).any(|w| w == ["-loglevel", "error"]));
    }

    #[test]
    fn test_finish_without_frames_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.mp4");
        let mut process =
            FfmpegProcess::new(&path, 30.0, "libx264").with_binary("/nonexistent/ffmpeg");
        process.finish().unwrap();
        process.finish().unwrap();
        assert!(!process.is_running());
        assert!(!path.exists());
    }

    #[test]
    fn test_spawn_failure_surfaces_on_first_feed() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = FfmpegProcess::new(dir.path().join("x.mp4"), 30.0, "libx264")
            .with_binary("/nonexistent/ffmpeg");
        let err = process.feed(&solid_frame(4, 2, 0)).unwrap_err();
        assert!(matches!(err, EncodeError::Spawn { .. }), "got {err}");
        assert_eq!(process.frames_fed(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_feed_streams_every_byte_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = stdin_copy_encoder(dir.path());
        let path = dir.path().join("nested").join("cam.mp4");

        let mut process =
            FfmpegProcess::new(&path, 30.0, "libx264").with_binary(encoder.to_string_lossy());
        for value in 0..5u8 {
            process.feed(&solid_frame(4, 3, value)).unwrap();
        }
        assert!(process.is_running());
        process.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 5 * 4 * 3 * 3);
        for (i, chunk) in bytes.chunks(4 * 3 * 3).enumerate() {
            assert!(chunk.iter().all(|&b| b == i as u8));
        }
        assert_eq!(process.frames_fed(), 5);
        assert_eq!(process.bytes_fed(), bytes.len() as u64);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let encoder =
            crate::testing::write_script(dir.path(), "failing-ffmpeg", "cat > /dev/null\nexit 3\n");

        let mut process = FfmpegProcess::new(dir.path().join("x.mp4"), 30.0, "libx264")
            .with_binary(encoder.to_string_lossy());
        process.feed(&solid_frame(2, 2, 1)).unwrap();
        let err = process.finish().unwrap_err();
        match err {
            EncodeError::EncoderExit { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[ignore = "requires ffmpeg with libx264 on PATH"]
    fn test_real_ffmpeg_produces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.mp4");
        let mut process = FfmpegProcess::new(&path, 30.0, "libx264");
        for i in 0..10u8 {
            process.feed(&solid_frame(64, 48, i * 20)).unwrap();
        }
        process.finish().unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
