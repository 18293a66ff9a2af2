//! Shared test doubles.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::bag::domain::bag_error::BagError;
use crate::bag::domain::bag_reader::{BagMessage, BagReader, Connection, MessageIter};
use crate::bag::domain::image_message::ImageMessage;
use crate::shared::frame::{Frame, PixelFormat};
use crate::video::domain::encode_error::EncodeError;
use crate::video::domain::encoder_catalog::EncoderCatalog;
use crate::video::domain::frame_preview::{FramePreview, PreviewError};
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::video_writer::{VideoWriter, VideoWriterFactory};
use crate::video::infrastructure::streaming_video_writer::{StreamingVideoWriter, WriterOptions};

// --- Frames and encoders ---

/// `width`x`height` rgb24 frame with every byte set to `value`.
pub fn solid_frame(width: u32, height: u32, value: u8) -> Frame {
    Frame::new(
        vec![value; (width * height * 3) as usize],
        width,
        height,
        PixelFormat::Rgb24,
    )
}

/// Writes an executable `/bin/sh` script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stand-in for ffmpeg: lists `libx264` when asked for encoders, otherwise
/// copies stdin verbatim to its last argument (the output path).
#[cfg(unix)]
pub fn stdin_copy_encoder(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-ffmpeg",
        "if [ \"$1\" = \"-hide_banner\" ]; then\n\
         \x20 echo ' V..... libx264              libx264 H.264'\n\
         \x20 exit 0\n\
         fi\n\
         for last; do :; done\n\
         cat > \"$last\"\n",
    )
}

pub struct FixedCatalog(Vec<String>);

impl FixedCatalog {
    pub fn new(encoders: &[&str]) -> Self {
        Self(encoders.iter().map(|e| e.to_string()).collect())
    }
}

impl EncoderCatalog for FixedCatalog {
    fn video_encoders(&self) -> Vec<String> {
        self.0.clone()
    }
}

// --- Sinks ---

#[derive(Default)]
struct Recorded {
    frames: Vec<Vec<u8>>,
    finish_calls: usize,
}

/// Keeps every fed frame's bytes. Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().frames.clone()
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().unwrap().frames.iter().map(Vec::len).sum()
    }

    pub fn finish_calls(&self) -> usize {
        self.inner.lock().unwrap().finish_calls
    }
}

impl FrameSink for RecordingSink {
    fn feed(&mut self, frame: &Frame) -> Result<(), EncodeError> {
        self.inner.lock().unwrap().frames.push(frame.data().to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        self.inner.lock().unwrap().finish_calls += 1;
        Ok(())
    }
}

/// Rejects every frame as if the encoder had closed its pipe.
#[derive(Clone, Default)]
pub struct FailingSink {
    finish_calls: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }
}

impl FrameSink for FailingSink {
    fn feed(&mut self, _frame: &Frame) -> Result<(), EncodeError> {
        Err(EncodeError::Write {
            frame: 0,
            source: io::Error::new(io::ErrorKind::BrokenPipe, "encoder went away"),
        })
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Blocks in `feed` until its `Gate` is opened, then records like
/// `RecordingSink`.
pub struct GatedSink {
    gate: Receiver<()>,
    recorded: RecordingSink,
}

pub struct Gate(Sender<()>);

impl Gate {
    pub fn open(self) {
        drop(self.0);
    }
}

impl GatedSink {
    pub fn new() -> (Self, Gate) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let sink = Self {
            gate: rx,
            recorded: RecordingSink::new(),
        };
        (sink, Gate(tx))
    }

    pub fn recorded(&self) -> RecordingSink {
        self.recorded.clone()
    }
}

impl FrameSink for GatedSink {
    fn feed(&mut self, frame: &Frame) -> Result<(), EncodeError> {
        // Returns once the gate's sender is dropped.
        let _ = self.gate.recv();
        self.recorded.feed(frame)
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        self.recorded.finish()
    }
}

#[derive(Clone, Default)]
pub struct RecordingPreview {
    inner: Arc<Mutex<(usize, bool)>>,
}

impl RecordingPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> usize {
        self.inner.lock().unwrap().0
    }

    pub fn closed(&self) -> bool {
        self.inner.lock().unwrap().1
    }
}

impl FramePreview for RecordingPreview {
    fn show(&mut self, _frame: &Frame) -> Result<(), PreviewError> {
        self.inner.lock().unwrap().0 += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.inner.lock().unwrap().1 = true;
    }
}

// --- Writer factories ---

/// Hands out threaded writers backed by `RecordingSink`s and remembers
/// what it created.
#[derive(Clone, Default)]
pub struct RecordingWriterFactory {
    created: Arc<Mutex<Vec<(PathBuf, f64, RecordingSink)>>>,
}

impl RecordingWriterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_paths(&self) -> Vec<PathBuf> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _, _)| path.clone())
            .collect()
    }

    pub fn fps(&self, index: usize) -> f64 {
        self.created.lock().unwrap()[index].1
    }

    pub fn sink(&self, index: usize) -> RecordingSink {
        self.created.lock().unwrap()[index].2.clone()
    }
}

impl VideoWriterFactory for RecordingWriterFactory {
    fn create(&self, output_path: &Path, fps: f64) -> Result<Box<dyn VideoWriter>, EncodeError> {
        let sink = RecordingSink::new();
        self.created
            .lock()
            .unwrap()
            .push((output_path.to_path_buf(), fps, sink.clone()));
        let writer =
            StreamingVideoWriter::with_sink(output_path, Box::new(sink), WriterOptions::default());
        Ok(Box::new(writer))
    }
}

/// Fails every session as if no codec were available.
pub struct NoCodecWriterFactory;

impl VideoWriterFactory for NoCodecWriterFactory {
    fn create(&self, _output_path: &Path, _fps: f64) -> Result<Box<dyn VideoWriter>, EncodeError> {
        Err(EncodeError::NoSupportedCodec {
            tried: vec!["libx264".to_string()],
        })
    }
}

// --- Bag messages ---

/// Unpadded image of `encoding` filled with `fill`. Unknown encodings
/// are sized as two bytes per pixel.
pub fn image_message(width: u32, height: u32, encoding: &str, fill: u8) -> ImageMessage {
    let channels = PixelFormat::from_ros_encoding(encoding).map_or(2, |f| f.channels() as u32);
    let step = width * channels;
    ImageMessage {
        stamp_sec: 0,
        stamp_nanosec: 0,
        frame_id: "camera".to_string(),
        height,
        width,
        encoding: encoding.to_string(),
        is_bigendian: false,
        step,
        data: vec![fill; (step * height) as usize],
    }
}

struct CdrWriter {
    buf: Vec<u8>,
    little_endian: bool,
}

impl CdrWriter {
    fn new(little_endian: bool) -> Self {
        let representation: u16 = if little_endian { 0x0001 } else { 0x0000 };
        let mut buf = representation.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0, 0]);
        Self { buf, little_endian }
    }

    fn align(&mut self, n: usize) {
        while (self.buf.len() - 4) % n != 0 {
            self.buf.push(0);
        }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.align(4);
        let bytes = if self.little_endian {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        };
        self.buf.extend_from_slice(&bytes);
    }

    fn string(&mut self, s: &str) {
        self.u32(s.len() as u32 + 1);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    fn bytes(&mut self, data: &[u8]) {
        self.u32(data.len() as u32);
        self.buf.extend_from_slice(data);
    }
}

/// Serializes `msg` the way a ROS 2 publisher would.
pub fn encode_image_cdr(msg: &ImageMessage, little_endian: bool) -> Vec<u8> {
    let mut w = CdrWriter::new(little_endian);
    w.u32(msg.stamp_sec as u32);
    w.u32(msg.stamp_nanosec);
    w.string(&msg.frame_id);
    w.u32(msg.height);
    w.u32(msg.width);
    w.string(&msg.encoding);
    w.u8(msg.is_bigendian as u8);
    w.u32(msg.step);
    w.bytes(&msg.data);
    w.buf
}

// --- Bags ---

/// `BagReader` over messages held in memory.
pub struct MemoryBagReader {
    path: PathBuf,
    connections: Vec<Connection>,
    messages: Vec<BagMessage>,
}

impl MemoryBagReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connections: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_connection(mut self, topic: &str, msgtype: &str) -> Self {
        self.connection(topic, msgtype);
        self
    }

    pub fn with_message(mut self, topic: &str, msgtype: &str, timestamp: i64, data: Vec<u8>) -> Self {
        let connection = self.connection(topic, msgtype);
        self.messages.push(BagMessage {
            connection,
            timestamp,
            data,
        });
        self
    }

    /// Adds `count` serialized images on `topic`, 1 ms apart.
    pub fn with_images(mut self, topic: &str, count: usize, image: &ImageMessage) -> Self {
        for i in 0..count {
            let msg = ImageMessage {
                data: vec![i as u8; image.data.len()],
                ..image.clone()
            };
            self = self.with_message(
                topic,
                crate::shared::constants::IMAGE_MSGTYPE,
                i as i64 * 1_000_000,
                encode_image_cdr(&msg, true),
            );
        }
        self
    }

    fn connection(&mut self, topic: &str, msgtype: &str) -> Connection {
        let connection = Connection::new(topic, msgtype);
        if !self.connections.contains(&connection) {
            self.connections.push(connection.clone());
        }
        connection
    }
}

impl BagReader for MemoryBagReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn messages<'a>(&'a self, connection: &Connection) -> Result<MessageIter<'a>, BagError> {
        let mut selected: Vec<BagMessage> = self
            .messages
            .iter()
            .filter(|m| m.connection.topic == connection.topic)
            .cloned()
            .collect();
        selected.sort_by_key(|m| m.timestamp);
        Ok(Box::new(selected.into_iter().map(Ok)))
    }
}

/// A rosbag2 sqlite3 split created on disk, plus the bag's `metadata.yaml`.
pub struct SqliteBagFixture {
    conn: rusqlite::Connection,
}

impl SqliteBagFixture {
    pub fn create(dir: &Path, file_name: &str) -> Self {
        std::fs::create_dir_all(dir).unwrap();
        let metadata = dir.join("metadata.yaml");
        if !metadata.exists() {
            std::fs::write(&metadata, "rosbag2_bagfile_information:\n  version: 5\n").unwrap();
        }

        let conn = rusqlite::Connection::open(dir.join(file_name)).unwrap();
        conn.execute_batch(
            "CREATE TABLE topics(
                 id INTEGER PRIMARY KEY,
                 name TEXT NOT NULL,
                 type TEXT NOT NULL,
                 serialization_format TEXT NOT NULL,
                 offered_qos_profiles TEXT NOT NULL);
             CREATE TABLE messages(
                 id INTEGER PRIMARY KEY,
                 topic_id INTEGER NOT NULL,
                 timestamp INTEGER NOT NULL,
                 data BLOB NOT NULL);
             CREATE INDEX timestamp_idx ON messages (timestamp ASC);",
        )
        .unwrap();
        Self { conn }
    }

    /// Returns the new topic's id.
    pub fn add_topic(&mut self, name: &str, msgtype: &str) -> i64 {
        self.conn
            .execute(
                "INSERT INTO topics (name, type, serialization_format, offered_qos_profiles)
                 VALUES (?1, ?2, 'cdr', '')",
                rusqlite::params![name, msgtype],
            )
            .unwrap();
        self.conn.last_insert_rowid()
    }

    pub fn add_message(&mut self, topic_id: i64, timestamp: i64, data: &[u8]) {
        self.conn
            .execute(
                "INSERT INTO messages (topic_id, timestamp, data) VALUES (?1, ?2, ?3)",
                rusqlite::params![topic_id, timestamp, data],
            )
            .unwrap();
    }
}
