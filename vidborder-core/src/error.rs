use std::path::PathBuf;
use thiserror::Error;

/// Every fatal condition a border run can hit.
#[derive(Error, Debug)]
pub enum BorderError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Video file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Could not open video file '{}': {reason}", path.display())]
    InputUnreadable { path: PathBuf, reason: String },

    #[error("Invalid video dimensions ({width}x{height}). Video file may be corrupted or empty.")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Could not write output '{}': {reason}", path.display())]
    OutputWrite { path: PathBuf, reason: String },

    #[error("Frame processing failed: {0}")]
    FrameProcessing(String),

    #[error("Merging audio failed ({status}):\n{stderr}")]
    AudioMerge { status: String, stderr: String },

    #[error("{0} not found. Install FFmpeg or point to it explicitly.")]
    EncoderNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BorderError>;
