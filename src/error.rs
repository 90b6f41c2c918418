use std::path::PathBuf;

use thiserror::Error;

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Fatal errors: any of these ends the run.
/// A capture that stops reading mid-file is not one of them; the run ends there normally.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open capture {path:?}: {source}")]
    OpenCapture {
        path: PathBuf,
        #[source]
        source: pcap::Error,
    },

    #[error("cannot create sample log {path:?}: {source}")]
    CreateLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sample log write failed: {0}")]
    WriteLog(#[source] std::io::Error),

    #[error("audio output failed: {0}")]
    Audio(#[from] AudioError),
}

/// Container failures, split so callers can tell a bad destination from a bad encode.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Format(hound::Error),
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => AudioError::Io(e),
            other => AudioError::Format(other),
        }
    }
}

/// Per-packet decode failure. The packet is skipped, the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload too short: need {needed} bytes, got {len}")]
    OutOfBounds { needed: usize, len: usize },
}
