use image::RgbImage;

use crate::error::{BorderError, Result};

/// A decoded video frame: packed RGB, 8 bits per channel.
pub type Frame = RgbImage;

/// Bytes occupied by one rgb24 frame.
pub fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Wrap raw rgb24 bytes as a [`Frame`], checking the buffer size.
pub fn frame_from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<Frame> {
    let got = bytes.len();
    RgbImage::from_raw(width, height, bytes).ok_or_else(|| {
        BorderError::FrameProcessing(format!(
            "expected {} bytes for a {width}x{height} frame, got {got}",
            frame_len(width, height)
        ))
    })
}
