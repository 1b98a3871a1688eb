use std::path::{Path, PathBuf};

use crate::error::{BorderError, Result};
use crate::geometry::validate_border;
use crate::progress::DEFAULT_PROGRESS_INTERVAL;
use crate::tools::ToolConfig;

pub const DEFAULT_BORDER_PERCENTAGE: f64 = 5.0;
pub const DEFAULT_CODEC: &str = "mp4v";

/// Everything a single run needs, validated once before processing begins.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub border_percentage: f64,
    pub keep_audio: bool,
    pub codec: String,
    pub progress_interval: u64,
    pub tools: ToolConfig,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input.into(),
            output_path: output.into(),
            border_percentage: DEFAULT_BORDER_PERCENTAGE,
            keep_audio: true,
            codec: DEFAULT_CODEC.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            tools: ToolConfig::default(),
        }
    }

    /// Configuration checks first, then the input's existence.
    pub fn validate(&self) -> Result<()> {
        validate_border(self.border_percentage)?;

        if self.codec.trim().is_empty() {
            return Err(BorderError::Configuration("codec must not be empty".to_string()));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(BorderError::Configuration(
                "output path must not be empty".to_string(),
            ));
        }

        if !self.input_path.is_file() {
            return Err(BorderError::InputNotFound(self.input_path.clone()));
        }

        if resolve_path(&self.input_path) == resolve_path(&self.output_path) {
            return Err(BorderError::Configuration(format!(
                "output path {} is the input video",
                self.output_path.display()
            )));
        }

        Ok(())
    }
}

/// Absolute form of a path that may not exist yet: the canonical path when it
/// does, otherwise its canonical parent joined with the file name.
fn resolve_path(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = path.canonicalize() {
        return Some(resolved);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    parent.canonicalize().ok().map(|dir| dir.join(name))
}
