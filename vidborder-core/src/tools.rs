//! Locating the external FFmpeg binaries.
//!
//! Resolution order for each program: an explicitly configured path, the bare
//! name on `PATH`, then the local cache directory (and, for `ffprobe`, the
//! directory the resolved `ffmpeg` lives in).

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{BorderError, Result};

/// Default directory searched for locally installed binaries.
pub const DEFAULT_CACHE_DIR: &str = "ffmpeg_bin";

/// Where to look for the external tools.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub cache_dir: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg: None,
            ffprobe: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// Resolved, runnable tool locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

pub fn resolve_tools(config: &ToolConfig) -> Result<ToolPaths> {
    let ffmpeg = resolve_program(
        "ffmpeg",
        config.ffmpeg.as_deref(),
        &[config.cache_dir.as_path()],
    )?;

    let mut probe_dirs: Vec<&Path> = Vec::new();
    if let Some(parent) = ffmpeg.parent()
        && !parent.as_os_str().is_empty()
    {
        probe_dirs.push(parent);
    }
    probe_dirs.push(config.cache_dir.as_path());

    let ffprobe = resolve_program("ffprobe", config.ffprobe.as_deref(), &probe_dirs)?;

    log::debug!("Using ffmpeg at {:?}, ffprobe at {:?}", ffmpeg, ffprobe);
    Ok(ToolPaths { ffmpeg, ffprobe })
}

/// Find a runnable `name`, preferring `explicit` when given.
pub fn resolve_program(name: &str, explicit: Option<&Path>, search_dirs: &[&Path]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if runs(path) {
            return Ok(path.to_path_buf());
        }
        return Err(BorderError::EncoderNotFound(format!(
            "{name} at {}",
            path.display()
        )));
    }

    if runs(Path::new(name)) {
        return Ok(PathBuf::from(name));
    }

    let file_name = executable_name(name);
    search_dirs
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| BorderError::EncoderNotFound(name.to_string()))
}

/// Platform file name of a program, e.g. `ffmpeg.exe` on Windows.
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn runs(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
