use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::shared::constants::{DEFAULT_CHANNEL_CAPACITY, DEQUEUE_TIMEOUT, FFMPEG_BINARY};
use crate::shared::frame::Frame;
use crate::video::domain::encode_error::EncodeError;
use crate::video::domain::encoder_catalog::EncoderCatalog;
use crate::video::domain::frame_preview::FramePreview;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::video_writer::{VideoWriter, WriterState};
use crate::video::infrastructure::codec_resolver::resolve_codec;
use crate::video::infrastructure::ffmpeg_process::FfmpegProcess;
use crate::video::infrastructure::frame_channel::{frame_channel, Dequeued, FrameReceiver, FrameSender};

/// How a writer moves frames to its sink.
#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// When false the writer only feeds the preview (no encoder, no codec lookup).
    pub enable_write: bool,
    /// Encode on a dedicated thread behind a bounded queue. When false,
    /// `write` feeds the encoder inline.
    pub threaded: bool,
    pub channel_capacity: usize,
    pub dequeue_wait: Duration,
    pub ffmpeg_binary: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            enable_write: true,
            threaded: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            dequeue_wait: DEQUEUE_TIMEOUT,
            ffmpeg_binary: FFMPEG_BINARY.to_string(),
        }
    }
}

/// One output file's encoding session.
///
/// Layout (threaded): `write → bounded queue → encoder thread → sink`.
///
/// The encoder thread starts with the first `write`. `release` raises the
/// stop flag, lets the thread drain the queue, finishes the sink and joins.
/// A failure on the encoder thread closes the queue; the producer sees the
/// original error on its next `write`, or from `release`.
pub struct StreamingVideoWriter {
    output_path: PathBuf,
    options: WriterOptions,
    state: WriterState,
    sink: Option<Box<dyn FrameSink>>,
    sender: Option<FrameSender>,
    stop: Arc<AtomicBool>,
    consumer: Option<JoinHandle<Result<u64, EncodeError>>>,
    preview: Option<Box<dyn FramePreview>>,
    frames_written: u64,
}

impl StreamingVideoWriter {
    /// Resolves a codec from `codec_preference` and prepares an ffmpeg
    /// session for `output_path`. No process is started until the first
    /// frame arrives.
    pub fn open<S: AsRef<str>>(
        output_path: &Path,
        fps: f64,
        catalog: &dyn EncoderCatalog,
        codec_preference: &[S],
        options: WriterOptions,
    ) -> Result<Self, EncodeError> {
        if !options.enable_write {
            return Ok(Self::build(output_path, None, options));
        }

        let codec = resolve_codec(catalog, codec_preference)?;
        log::debug!("Using codec {codec} for {}", output_path.display());
        let process = FfmpegProcess::new(output_path, fps, codec)
            .with_binary(options.ffmpeg_binary.clone());
        Ok(Self::build(output_path, Some(Box::new(process)), options))
    }

    /// Builds a writer around an arbitrary sink.
    pub fn with_sink(output_path: &Path, sink: Box<dyn FrameSink>, options: WriterOptions) -> Self {
        Self::build(output_path, Some(sink), options)
    }

    pub fn with_preview(mut self, preview: Box<dyn FramePreview>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn build(output_path: &Path, sink: Option<Box<dyn FrameSink>>, options: WriterOptions) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            options,
            state: WriterState::Idle,
            sink,
            sender: None,
            stop: Arc::new(AtomicBool::new(false)),
            consumer: None,
            preview: None,
            frames_written: 0,
        }
    }

    fn start(&mut self) -> Result<(), EncodeError> {
        self.state = WriterState::Streaming;
        if !self.options.enable_write || !self.options.threaded {
            return Ok(());
        }

        let sink = self.sink.take().ok_or(EncodeError::Closed)?;
        let (tx, rx) = frame_channel(self.options.channel_capacity, self.options.dequeue_wait);
        let stop = self.stop.clone();
        let handle = std::thread::Builder::new()
            .name("video-writer".to_string())
            .spawn(move || run_consumer(sink, rx, stop))
            .map_err(|e| {
                self.state = WriterState::Closed;
                EncodeError::SessionFailed(format!("failed to start encoder thread: {e}"))
            })?;

        self.sender = Some(tx);
        self.consumer = Some(handle);
        Ok(())
    }

    fn encode(&mut self, frame: &Frame) -> Result<(), EncodeError> {
        if let Some(sender) = &self.sender {
            if sender.enqueue(frame).is_err() {
                return Err(self.consumer_failure());
            }
            return Ok(());
        }

        let sink = self.sink.as_mut().ok_or(EncodeError::Closed)?;
        if let Err(e) = sink.feed(frame) {
            if let Err(finish_err) = sink.finish() {
                log::debug!("Encoder cleanup after failure also failed: {finish_err}");
            }
            self.state = WriterState::Closed;
            return Err(e);
        }
        Ok(())
    }

    /// The encoder thread hung up early: collect its error and close.
    fn consumer_failure(&mut self) -> EncodeError {
        self.sender = None;
        self.state = WriterState::Closed;
        self.close_preview();
        match self.join_consumer() {
            Err(e) => e,
            Ok(_) => EncodeError::SessionFailed("encoder thread stopped early".to_string()),
        }
    }

    fn join_consumer(&mut self) -> Result<u64, EncodeError> {
        match self.consumer.take() {
            Some(handle) => handle.join().unwrap_or(Err(EncodeError::ConsumerPanicked)),
            None => Ok(0),
        }
    }

    fn finish_sink(&mut self) -> Result<(), EncodeError> {
        match self.sink.as_mut() {
            Some(sink) => sink.finish(),
            None => Ok(()),
        }
    }

    fn close_preview(&mut self) {
        if let Some(preview) = self.preview.as_mut() {
            preview.close();
        }
    }
}

impl VideoWriter for StreamingVideoWriter {
    fn write(&mut self, frame: &Frame) -> Result<(), EncodeError> {
        if let Some(preview) = self.preview.as_mut() {
            if let Err(e) = preview.show(frame) {
                log::warn!("Preview failed for {}: {e}", self.output_path.display());
            }
        }

        match self.state {
            WriterState::Closed | WriterState::Draining => return Err(EncodeError::Closed),
            WriterState::Idle => self.start()?,
            WriterState::Streaming => {}
        }

        if self.options.enable_write {
            self.encode(frame)?;
        }
        self.frames_written += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), EncodeError> {
        match self.state {
            WriterState::Closed => return Ok(()),
            WriterState::Idle => {
                self.state = WriterState::Closed;
                self.close_preview();
                return self.finish_sink();
            }
            WriterState::Streaming | WriterState::Draining => {}
        }

        self.state = WriterState::Draining;
        let result = if self.consumer.is_some() {
            self.stop.store(true, Ordering::Release);
            self.sender = None;
            self.join_consumer().map(|fed| {
                log::debug!("Encoder thread drained {fed} frames for {}", self.output_path.display());
            })
        } else {
            self.finish_sink()
        };

        self.state = WriterState::Closed;
        self.close_preview();
        result
    }

    fn state(&self) -> WriterState {
        self.state
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for StreamingVideoWriter {
    fn drop(&mut self) {
        if self.state != WriterState::Closed {
            if let Err(e) = self.release() {
                log::warn!("Releasing {} on drop failed: {e}", self.output_path.display());
            }
        }
    }
}

/// Encoder thread body: feed queued frames until stopped and drained,
/// then finish the sink. Returns the number of frames fed.
fn run_consumer(
    mut sink: Box<dyn FrameSink>,
    rx: FrameReceiver,
    stop: Arc<AtomicBool>,
) -> Result<u64, EncodeError> {
    let mut fed = 0u64;
    let outcome = loop {
        if stop.load(Ordering::Acquire) && rx.is_empty() {
            break Ok(());
        }
        match rx.dequeue() {
            Dequeued::Frame(frame) => {
                if let Err(e) = sink.feed(&frame) {
                    break Err(e);
                }
                fed += 1;
            }
            Dequeued::Empty => {}
            Dequeued::Disconnected => break Ok(()),
        }
    };

    // Hang up first so a blocked producer wakes while the encoder finalizes.
    drop(rx);
    let finished = sink.finish();
    outcome.and(finished).map(|()| fed)
}
