//! Error types for segment stream operations

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegcatError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Seed {0:?} has no trailing digit run")]
    NoDigitRun(String),

    #[error("Seed segment not found: {0}")]
    SegmentNotFound(String),

    #[error("Size unavailable for segment {0}")]
    SizeUnavailable(String),

    #[error("No segment is open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, SegcatError>;
