use crate::error::{BorderError, Result};

/// Upper bound (exclusive) for the border percentage of each edge.
pub const MAX_BORDER_PERCENTAGE: f64 = 50.0;

/// Inscribed rectangle and its centering offset, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub source_width: u32,
    pub source_height: u32,
    pub border_percentage: f64,
    pub target_width: u32,
    pub target_height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl Geometry {
    /// Leading-edge border in pixels on each axis, as `(left, top)`.
    pub fn border_pixels(&self) -> (u32, u32) {
        (self.x_offset, self.y_offset)
    }

    /// Leading-edge border as a percentage of each axis, as `(left, top)`.
    pub fn border_ratio(&self) -> (f64, f64) {
        (
            self.x_offset as f64 / self.source_width as f64 * 100.0,
            self.y_offset as f64 / self.source_height as f64 * 100.0,
        )
    }

    /// Whether `(x, y)` on the output canvas falls inside the content rectangle.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x_offset
            && x < self.x_offset + self.target_width
            && y >= self.y_offset
            && y < self.y_offset + self.target_height
    }
}

/// Reject border percentages outside `[0, 50)`.
pub fn validate_border(border_percentage: f64) -> Result<()> {
    if !border_percentage.is_finite()
        || !(0.0..MAX_BORDER_PERCENTAGE).contains(&border_percentage)
    {
        return Err(BorderError::Configuration(format!(
            "Border percentage must be between 0 and 50 (got {border_percentage})"
        )));
    }
    Ok(())
}

/// Compute the centered, aspect-preserving rectangle that leaves
/// `border_percentage` of each axis as background on both edges.
///
/// All rounding is floor. The aspect steps run in integer arithmetic so
/// `floor(h * W / H)` is exact; both target dimensions are kept at or above
/// one pixel.
pub fn compute_geometry(
    source_width: u32,
    source_height: u32,
    border_percentage: f64,
) -> Result<Geometry> {
    if source_width == 0 || source_height == 0 {
        return Err(BorderError::InvalidDimensions {
            width: source_width,
            height: source_height,
        });
    }
    validate_border(border_percentage)?;

    let content_percentage = 100.0 - 2.0 * border_percentage;
    let scale_axis = |len: u32| ((len as f64 * content_percentage / 100.0).floor() as u32).max(1);

    let (w, h) = (source_width as u64, source_height as u64);
    let mut target_height = scale_axis(source_height);
    let mut target_width = ((target_height as u64 * w / h) as u32).max(1);

    let max_target_width = scale_axis(source_width);
    if target_width > max_target_width {
        target_width = max_target_width;
        target_height = ((target_width as u64 * h / w) as u32).max(1);
    }

    Ok(Geometry {
        source_width,
        source_height,
        border_percentage,
        target_width,
        target_height,
        x_offset: (source_width - target_width) / 2,
        y_offset: (source_height - target_height) / 2,
    })
}
