//! Vidborder Core - shrink every frame of a video onto a black border
//!
//! The frame work is pure Rust; decoding, encoding and audio muxing are
//! delegated to the FFmpeg command-line tools:
//! - Border geometry: an aspect-preserving rectangle centered in the frame
//! - Frame compositing: bilinear shrink onto a black canvas of the source size
//! - Frame streaming through `ffmpeg` pipes as raw rgb24
//! - Optional re-attachment of the original audio track
//! - Tool discovery on `PATH` or in a local cache directory

pub mod compositor;
pub mod config;
pub mod error;
pub mod ffmpeg_wrapper;
pub mod frame;
pub mod frame_io;
pub mod geometry;
pub mod processor;
pub mod progress;
pub mod tools;

// Re-export commonly used types at the crate root
pub use compositor::composite_frame;
pub use config::RunConfig;
pub use error::{BorderError, Result};
pub use ffmpeg_wrapper::{FFmpegCommand, FrameRate, VideoInfo, check_ffmpeg, get_video_info, merge_audio};
pub use frame::Frame;
pub use frame_io::{FFmpegReader, FFmpegWriter, FrameSink, FrameSource};
pub use geometry::{Geometry, compute_geometry};
pub use processor::{BorderProcessor, ProcessReport, process_frames};
pub use progress::FrameProgress;
pub use tools::{ToolConfig, ToolPaths, resolve_tools};
