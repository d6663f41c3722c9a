//! Error types for the hardware bridge

use thiserror::Error;

/// Why a line could not be turned into a ranging frame.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("malformed JSON at offset {offset}: {message} (near {context:?})")]
    Malformed { offset: usize, message: String, context: String },

    #[error("frame does not match the schema: {0}")]
    Schema(String),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Frame queue is full")]
    QueueFull,

    #[error("Bridge is shut down")]
    Closed,

    #[error("Gave up after {0} failed connection attempts")]
    Exhausted(u32),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
