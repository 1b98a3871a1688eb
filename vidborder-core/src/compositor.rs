use image::imageops::{self, FilterType};
use image::Rgb;

use crate::error::{BorderError, Result};
use crate::frame::Frame;
use crate::geometry::Geometry;

/// Canvas fill outside the content rectangle.
pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Shrink `frame` to the geometry's target size and center it on a black
/// canvas of the source size. The input frame is left untouched.
pub fn composite_frame(frame: &Frame, geometry: &Geometry) -> Result<Frame> {
    let expected = (geometry.source_width, geometry.source_height);
    if frame.dimensions() != expected {
        return Err(BorderError::FrameProcessing(format!(
            "frame is {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            expected.0,
            expected.1
        )));
    }

    if (geometry.target_width, geometry.target_height) == expected {
        return Ok(frame.clone());
    }

    let resized = imageops::resize(
        frame,
        geometry.target_width,
        geometry.target_height,
        FilterType::Triangle,
    );

    let mut canvas = Frame::from_pixel(expected.0, expected.1, BACKGROUND);
    imageops::replace(
        &mut canvas,
        &resized,
        geometry.x_offset as i64,
        geometry.y_offset as i64,
    );
    Ok(canvas)
}
