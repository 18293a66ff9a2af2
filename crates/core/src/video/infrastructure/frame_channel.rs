use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("frame channel closed by the encoder thread")]
pub struct ChannelClosed;

/// Outcome of one bounded wait on the queue.
#[derive(Debug)]
pub enum Dequeued {
    Frame(Frame),
    /// Nothing arrived within the wait; the producer is still connected.
    Empty,
    /// The producer hung up and every queued frame has been handed out.
    Disconnected,
}

/// Creates a bounded FIFO between one producer and one encoder thread.
///
/// `enqueue` blocks while `capacity` frames are waiting, which throttles
/// frame production to encoder throughput.
pub fn frame_channel(capacity: usize, wait: Duration) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (FrameSender { tx }, FrameReceiver { rx, wait })
}

pub struct FrameSender {
    tx: Sender<Frame>,
}

impl FrameSender {
    /// Copies `frame` into the queue, blocking while it is full.
    pub fn enqueue(&self, frame: &Frame) -> Result<(), ChannelClosed> {
        self.tx.send(frame.clone()).map_err(|_| ChannelClosed)
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

pub struct FrameReceiver {
    rx: Receiver<Frame>,
    wait: Duration,
}

impl FrameReceiver {
    pub fn dequeue(&self) -> Dequeued {
        match self.rx.recv_timeout(self.wait) {
            Ok(frame) => Dequeued::Frame(frame),
            Err(RecvTimeoutError::Timeout) => Dequeued::Empty,
            Err(RecvTimeoutError::Disconnected) => Dequeued::Disconnected,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
