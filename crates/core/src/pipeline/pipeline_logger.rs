use std::time::{Duration, Instant};

/// Cross-cutting logger for conversion events.
///
/// Decouples the driver from specific output mechanisms so callers can
/// observe a conversion without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report that `frames` frames of `topic` have been written so far.
    fn progress(&mut self, topic: &str, frames: u64);

    /// Record a topic whose video was written completely.
    fn topic_done(&mut self, topic: &str, frames: u64, elapsed: Duration);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _topic: &str, _frames: u64) {}
    fn topic_done(&mut self, _topic: &str, _frames: u64, _elapsed: Duration) {}
    fn info(&mut self, _message: &str) {}
}

struct TopicRecord {
    topic: String,
    frames: u64,
    elapsed: Duration,
}

/// Logger backed by the `log` crate.
///
/// Progress output is throttled to every `throttle_frames` frames so long
/// recordings do not flood the log.
pub struct LogPipelineLogger {
    throttle_frames: u64,
    start_time: Instant,
    topics: Vec<TopicRecord>,
    messages: Vec<String>,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            start_time: Instant::now(),
            topics: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary, or `None` if no topic was written.
    pub fn summary_string(&self) -> Option<String> {
        if self.topics.is_empty() {
            return None;
        }

        let total_frames: u64 = self.topics.iter().map(|t| t.frames).sum();
        let mut lines = vec![format!(
            "Conversion summary ({} videos, {total_frames} frames, {:.1}s total):",
            self.topics.len(),
            self.start_time.elapsed().as_secs_f64()
        )];

        for record in &self.topics {
            let secs = record.elapsed.as_secs_f64();
            let fps = if secs > 0.0 {
                record.frames as f64 / secs
            } else {
                0.0
            };
            lines.push(format!(
                "  {}: {} frames in {secs:.1}s ({fps:.1} fps)",
                record.topic, record.frames
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(crate::shared::constants::DEFAULT_PROGRESS_EVERY)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, topic: &str, frames: u64) {
        if frames > 0 && frames % self.throttle_frames == 0 {
            log::info!("{topic}: {frames} frames written");
        }
    }

    fn topic_done(&mut self, topic: &str, frames: u64, elapsed: Duration) {
        log::info!("{topic}: done, {frames} frames");
        self.topics.push(TopicRecord {
            topic: topic.to_string(),
            frames,
            elapsed,
        });
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
