use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("no supported video codec found (tried: {})", .tried.join(", "))]
    NoSupportedCodec { tried: Vec<String> },
    #[error("failed to spawn encoder `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("encoder stdin was not captured")]
    MissingStdin,
    #[error("failed to write frame {frame} to encoder: {source}")]
    Write {
        frame: u64,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for encoder to exit: {0}")]
    Wait(#[source] io::Error),
    #[error("encoder exited with {status} while writing {path}")]
    EncoderExit { status: ExitStatus, path: PathBuf },
    /// A failure on the encoder thread, surfaced to the producer.
    #[error("encoding session failed: {0}")]
    SessionFailed(String),
    #[error("encoder thread panicked")]
    ConsumerPanicked,
    #[error("video writer is already closed")]
    Closed,
}
