use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YdfError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Channel index {0} out of range")]
    InvalidChannelIndex(usize),

    #[error("Event index {0} out of range")]
    InvalidEventIndex(usize),

    #[error("Event {index} (offset {start}, length {length}) exceeds the {available}-byte event block")]
    EventOutOfRange {
        index: usize,
        start: usize,
        length: usize,
        available: usize,
    },

    #[error("Event {index} ({label}) has a malformed JSON payload: {source}")]
    EventPayload {
        index: usize,
        label: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, YdfError>;
