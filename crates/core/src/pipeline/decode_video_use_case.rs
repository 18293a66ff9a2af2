use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::bag::domain::bag_reader::{BagReader, Connection};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::VIDEO_EXTENSION;
use crate::video::domain::video_writer::{VideoWriter, VideoWriterFactory};

#[derive(Clone, Debug, PartialEq)]
pub enum TopicStatus {
    Written,
    /// The output file already existed and `skip_exist` was set.
    SkippedExisting,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicOutcome {
    pub topic: String,
    pub output_path: PathBuf,
    pub status: TopicStatus,
    pub frames: u64,
}

/// What happened to each image topic of one bag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodeReport {
    pub bag: PathBuf,
    pub output_dir: PathBuf,
    /// Image topics left out because their first message has an
    /// unsupported encoding or cannot be decoded.
    pub excluded: Vec<String>,
    pub topics: Vec<TopicOutcome>,
}

impl DecodeReport {
    pub fn written(&self) -> usize {
        self.count(|s| *s == TopicStatus::Written)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| *s == TopicStatus::SkippedExisting)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, TopicStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&TopicStatus) -> bool) -> usize {
        self.topics.iter().filter(|t| pred(&t.status)).count()
    }
}

/// Turns every encodable image topic of a bag into one video:
/// list connections → filter image topics → stream frames → release.
///
/// A topic that fails is recorded in the report and the remaining topics
/// are still converted.
pub struct DecodeVideoUseCase {
    factory: Box<dyn VideoWriterFactory>,
    logger: Box<dyn PipelineLogger>,
    fps: f64,
    out_dir: Option<PathBuf>,
    skip_exist: bool,
}

impl DecodeVideoUseCase {
    pub fn new(
        factory: Box<dyn VideoWriterFactory>,
        logger: Box<dyn PipelineLogger>,
        fps: f64,
        out_dir: Option<PathBuf>,
        skip_exist: bool,
    ) -> Self {
        Self {
            factory,
            logger,
            fps,
            out_dir,
            skip_exist,
        }
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn logger_mut(&mut self) -> &mut dyn PipelineLogger {
        self.logger.as_mut()
    }

    pub fn execute(&mut self, reader: &dyn BagReader) -> Result<DecodeReport, PipelineError> {
        let bag = reader.path().to_path_buf();
        self.logger.info(&format!("Read bag {}", bag.display()));
        for connection in reader.connections() {
            self.logger
                .info(&format!("  {} {}", connection.topic, connection.msgtype));
        }

        let output_dir = output_dir_for(&bag, self.out_dir.as_deref());
        let mut report = DecodeReport {
            bag,
            output_dir: output_dir.clone(),
            ..DecodeReport::default()
        };

        let mut encodable = Vec::new();
        for connection in reader.connections().iter().filter(|c| c.is_image()) {
            if is_encodable(reader, connection)? {
                encodable.push(connection.clone());
            } else {
                report.excluded.push(connection.topic.clone());
            }
        }
        let topics: Vec<&str> = encodable.iter().map(|c| c.topic.as_str()).collect();
        self.logger.info(&format!("Video topics: {topics:?}"));

        for (i, connection) in encodable.iter().enumerate() {
            self.logger
                .info(&format!("Processing topic [{i}]: {}", connection.topic));
            let output_path = output_dir.join(format!(
                "{}.{VIDEO_EXTENSION}",
                sanitize_topic(&connection.topic)
            ));

            let outcome = if self.skip_exist && output_path.exists() {
                self.logger
                    .info(&format!("{} exists, skipping", output_path.display()));
                TopicOutcome {
                    topic: connection.topic.clone(),
                    output_path,
                    status: TopicStatus::SkippedExisting,
                    frames: 0,
                }
            } else {
                match self.write_topic(reader, connection, &output_path) {
                    Ok(frames) => TopicOutcome {
                        topic: connection.topic.clone(),
                        output_path,
                        status: TopicStatus::Written,
                        frames,
                    },
                    Err(e) => {
                        log::error!("{}: {e}", connection.topic);
                        TopicOutcome {
                            topic: connection.topic.clone(),
                            output_path,
                            status: TopicStatus::Failed(e.to_string()),
                            frames: 0,
                        }
                    }
                }
            };
            report.topics.push(outcome);
        }

        Ok(report)
    }

    fn write_topic(
        &mut self,
        reader: &dyn BagReader,
        connection: &Connection,
        output_path: &Path,
    ) -> Result<u64, PipelineError> {
        let started = Instant::now();
        let mut writer = self.factory.create(output_path, self.fps)?;

        let streamed = self.stream_frames(reader, connection, writer.as_mut());
        let released = writer.release();
        let frames = match streamed {
            Ok(frames) => {
                released?;
                frames
            }
            Err(e) => {
                if let Err(release_err) = released {
                    log::debug!("Release after failure also failed: {release_err}");
                }
                return Err(e);
            }
        };

        self.logger
            .topic_done(&connection.topic, frames, started.elapsed());
        Ok(frames)
    }

    fn stream_frames(
        &mut self,
        reader: &dyn BagReader,
        connection: &Connection,
        writer: &mut dyn VideoWriter,
    ) -> Result<u64, PipelineError> {
        for message in reader.messages(connection)? {
            let image = reader.deserialize_image(&message?)?;
            writer.write(&image.into_frame()?)?;
            self.logger
                .progress(&connection.topic, writer.frames_written());
        }
        Ok(writer.frames_written())
    }
}

/// Whether the first message of `connection` has an encoding that can be
/// streamed as-is.
fn is_encodable(reader: &dyn BagReader, connection: &Connection) -> Result<bool, PipelineError> {
    let Some(first) = reader.messages(connection)?.next() else {
        log::warn!("{} has no messages", connection.topic);
        return Ok(false);
    };
    match reader.deserialize_image(&first?) {
        Ok(image) if image.pixel_format().is_some() => Ok(true),
        Ok(image) => {
            log::info!(
                "Skipping {}: unsupported encoding '{}'",
                connection.topic,
                image.encoding
            );
            Ok(false)
        }
        Err(e) => {
            log::warn!("Skipping {}: {e}", connection.topic);
            Ok(false)
        }
    }
}

/// Output file stem for a topic: leading `/` dropped, other `/` become `_`.
pub fn sanitize_topic(topic: &str) -> String {
    topic.strip_prefix('/').unwrap_or(topic).replace('/', "_")
}

/// The bag directory itself, or `<out_dir>/<bag name>`.
pub fn output_dir_for(bag: &Path, out_dir: Option<&Path>) -> PathBuf {
    match (out_dir, bag.file_name()) {
        (Some(root), Some(name)) => root.join(name),
        (Some(root), None) => root.to_path_buf(),
        (None, _) => bag.to_path_buf(),
    }
}
